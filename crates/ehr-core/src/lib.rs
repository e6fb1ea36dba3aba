//! Encounter dataset pipeline.
//!
//! [`run_pipeline`] drives every registry source through load, impute and
//! dedupe/aggregate, merges the results per the merge plan, checks key
//! uniqueness and only then writes the dataset.

pub mod error;
pub mod options;
pub mod pipeline;
pub mod prepare;

pub use error::{PipelineError, Stage};
pub use options::{DEFAULT_OUTPUT_PATH, DEFAULT_RAW_DIR, DEFAULT_SAMPLE_ROWS, PipelineOptions};
pub use pipeline::{FINAL_STAGE, PipelineOutput, prepare_sources, run_pipeline};
pub use prepare::{PreparedSource, SourceSummary, prepare_source};
