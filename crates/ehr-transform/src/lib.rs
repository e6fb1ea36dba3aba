//! Per-source cleaning stages and the merge engine.
//!
//! All stages operate on [`ehr_model::Table`] and take either `&mut Table`
//! (in-place stages) or `Table` by value (stages that reshape the table).

pub mod aggregate;
pub mod dedupe;
pub mod error;
pub mod impute;
pub mod merge;

pub use aggregate::{SUMMARY_SEPARATOR, aggregate_child, summarize};
pub use dedupe::dedupe_by_primary_key;
pub use error::TransformError;
pub use impute::impute_missing;
pub use merge::{JoinStats, JoinStep, left_join, merge_tables};
