//! External (public API) data set versions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataSetVersionStatus {
    Processing,
    Failed,
    Mapping,
    Draft,
    Published,
    Deprecated,
    Withdrawn,
    Cancelled,
}

/// Public `major.minor.patch` version of a data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PublicVersion {
    pub fn is_patch(&self) -> bool {
        self.patch > 0
    }
}

impl FromStr for PublicVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('v').unwrap_or(s);
        let mut parts = trimmed.split('.');
        let mut next = |name: &str| -> Result<u32, String> {
            match parts.next() {
                None => Ok(0),
                Some(p) => p
                    .parse()
                    .map_err(|_| format!("Invalid {} component in version '{}'", name, s)),
            }
        };

        let major = next("major")?;
        let minor = next("minor")?;
        let patch = next("patch")?;

        if parts.next().is_some() {
            return Err(format!("Too many components in version '{}'", s));
        }

        Ok(Self {
            major,
            minor,
            patch,
        })
    }
}

impl TryFrom<String> for PublicVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PublicVersion> for String {
    fn from(version: PublicVersion) -> Self {
        version.to_string()
    }
}

impl fmt::Display for PublicVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetVersion {
    pub id: Uuid,
    pub data_set_id: Uuid,
    pub data_set_title: String,
    pub version: PublicVersion,
    pub status: DataSetVersionStatus,
}

/// Progress of the incremental field mapping between two data set versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingStatus {
    pub locations_complete: bool,
    pub filters_complete: bool,
    /// A breaking category change was detected
    pub has_major_version_update: bool,
}
