//! Data File Replacement
//!
//! Replacing a data file runs in four stages:
//!
//! 1. **Matchers**: find the equivalent of each original item in the replacement subject
//! 2. **Builder**: assemble a `ReplacementPlan` covering every data block, footnote and linked API data set
//! 3. **Validity gate**: refuse to proceed unless every leaf of the plan resolves
//! 4. **Applier**: rewrite the references and retire the original file

pub mod applier;
pub mod builder;
pub mod matcher;
pub mod plan;
pub mod service;

pub use builder::{LinkedDataSetVersion, PlanBuilder, PlanInputs};
pub use plan::ReplacementPlan;
pub use service::{ReplacementFiles, ReplacementService};
