//! Run configuration for the pipeline.

use std::path::{Path, PathBuf};

pub const DEFAULT_RAW_DIR: &str = "data/raw";
pub const DEFAULT_OUTPUT_PATH: &str = "data/processed/final_healthcare_dataset.csv";
pub const DEFAULT_SAMPLE_ROWS: usize = 3;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory holding one CSV file per registry source.
    pub raw_dir: PathBuf,
    /// Where the merged dataset is written. `None` validates without writing.
    pub output_path: Option<PathBuf>,
    /// Prepare sources on the rayon thread pool.
    pub parallel: bool,
    /// Capture table snapshots after every stage.
    pub diagnostics: bool,
    /// Rows included in each snapshot sample.
    pub sample_rows: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            output_path: Some(PathBuf::from(DEFAULT_OUTPUT_PATH)),
            parallel: false,
            diagnostics: true,
            sample_rows: DEFAULT_SAMPLE_ROWS,
        }
    }
}

impl PipelineOptions {
    pub fn new(raw_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output_path = path;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: bool) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub fn with_sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = rows;
        self
    }

    pub fn raw_dir(&self) -> &Path {
        &self.raw_dir
    }
}
