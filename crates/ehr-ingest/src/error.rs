use std::path::PathBuf;

use ehr_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("source `{source_name}` not found or unreadable at {path}: {source}")]
    SourceNotFound {
        source_name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source `{source_name}` ({path}) has no column `{column}` declared in the registry")]
    SchemaMismatch {
        source_name: String,
        path: PathBuf,
        column: String,
    },

    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} record {record} has {actual} fields but the header has {expected}")]
    TooManyFields {
        path: PathBuf,
        record: u64,
        expected: usize,
        actual: usize,
    },

    #[error("{path} record {record}, column `{column}`: {source}")]
    InvalidValue {
        path: PathBuf,
        record: u64,
        column: String,
        #[source]
        source: ModelError,
    },
}

impl IngestError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
