//! Domain models
//!
//! Statistics-domain metadata, content-domain files and data blocks, and
//! external data set versions.

pub mod content;
pub mod data_set;
pub mod statistics;

// Re-export commonly used types
pub use content::*;
pub use data_set::*;
pub use statistics::*;
