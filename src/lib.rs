//! Data file replacement for published statistics
//!
//! Swaps a release's data file for a revised one, repointing every data block,
//! footnote and linked API data set at the new subject, but only when every
//! reference can be matched.

pub mod config;
pub mod error;
pub mod label_order;
pub mod meta;
pub mod models;
pub mod replacement;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{ReplacementError, ReplacementResult};
pub use replacement::{ReplacementPlan, ReplacementService};
