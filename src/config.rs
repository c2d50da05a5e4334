//! Application configuration module
//!
//! Handles loading and validating runner configuration from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue(format!(
                "LOG_FORMAT must be 'compact' or 'json', got '{}'",
                other
            ))),
        }
    }
}

/// Complete runner settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// JSON snapshot the in-memory stores are seeded from
    pub fixture: PathBuf,
    pub original_file_id: Uuid,
    pub replacement_file_id: Uuid,
    /// Perform the replacement rather than only planning it
    pub apply: bool,
    /// Where the resulting state is written after a replacement
    pub output: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingVar(key.to_string()))
        };
        let file_id = |key: &str| -> Result<Uuid, ConfigError> {
            let value = required(key)?;
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{} is not a UUID: '{}'", key, value)))
        };

        let apply = match lookup("REPLACEMENT_APPLY") {
            Some(value) => parse_bool("REPLACEMENT_APPLY", &value)?,
            None => false,
        };

        let log_format = lookup("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            fixture: PathBuf::from(required("REPLACEMENT_FIXTURE")?),
            original_file_id: file_id("ORIGINAL_FILE_ID")?,
            replacement_file_id: file_id("REPLACEMENT_FILE_ID")?,
            apply,
            output: lookup("REPLACEMENT_OUTPUT")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            log_format,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let original = Uuid::new_v4();
        let replacement = Uuid::new_v4();
        let (original_id, replacement_id) = (original.to_string(), replacement.to_string());
        let settings = settings(&[
            ("REPLACEMENT_FIXTURE", "fixtures/absence.json"),
            ("ORIGINAL_FILE_ID", original_id.as_str()),
            ("REPLACEMENT_FILE_ID", replacement_id.as_str()),
        ])
        .unwrap();

        assert_eq!(settings.original_file_id, original);
        assert_eq!(settings.replacement_file_id, replacement);
        assert!(!settings.apply);
        assert_eq!(settings.output, None);
        assert_eq!(settings.log_format, LogFormat::Compact);
    }

    #[test]
    fn test_apply_and_json_logging() {
        let id = Uuid::new_v4().to_string();
        let settings = settings(&[
            ("REPLACEMENT_FIXTURE", "state.json"),
            ("ORIGINAL_FILE_ID", id.as_str()),
            ("REPLACEMENT_FILE_ID", id.as_str()),
            ("REPLACEMENT_APPLY", "true"),
            ("REPLACEMENT_OUTPUT", "out.json"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert!(settings.apply);
        assert_eq!(settings.output, Some(PathBuf::from("out.json")));
        assert_eq!(settings.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_fixture() {
        let err = settings(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref key) if key == "REPLACEMENT_FIXTURE"));
    }

    #[test]
    fn test_invalid_file_id() {
        let err = settings(&[
            ("REPLACEMENT_FIXTURE", "state.json"),
            ("ORIGINAL_FILE_ID", "not-a-uuid"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
