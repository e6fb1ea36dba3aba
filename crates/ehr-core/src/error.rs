use std::fmt;

use ehr_ingest::IngestError;
use ehr_report::ReportError;
use ehr_transform::TransformError;
use ehr_validate::ValidationError;

/// Pipeline stage, used to say where a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    Impute,
    Dedupe,
    Aggregate,
    Merge,
    Validate,
    Write,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Impute => "impute",
            Self::Dedupe => "dedupe",
            Self::Aggregate => "aggregate",
            Self::Merge => "merge",
            Self::Validate => "validate",
            Self::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} stage failed for source `{source_name}`: {source}")]
    Ingest {
        stage: Stage,
        source_name: String,
        #[source]
        source: IngestError,
    },

    #[error("{stage} stage failed for source `{source_name}`: {source}")]
    Transform {
        stage: Stage,
        source_name: String,
        #[source]
        source: TransformError,
    },

    #[error("merge plan references source `{0}` which was not prepared")]
    MissingSource(String),

    #[error("validate stage failed: {0}")]
    Validation(#[source] ValidationError),

    #[error("write stage failed: {0}")]
    Output(#[source] ReportError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Ingest { stage, .. } | Self::Transform { stage, .. } => *stage,
            Self::MissingSource(_) => Stage::Merge,
            Self::Validation(_) => Stage::Validate,
            Self::Output(_) => Stage::Write,
        }
    }
}
