#![deny(unsafe_code)]

use std::path::PathBuf;

use ehr_model::{ColumnType, ModelError};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML registry {origin}: {source}")]
    Toml {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid registry: {message}")]
    InvalidManifest { message: String },

    #[error("source `{source_name}`: {source}")]
    Model {
        source_name: String,
        #[source]
        source: ModelError,
    },

    #[error("duplicate source name: {name}")]
    DuplicateSource { name: String },

    #[error("source `{source_name}` declares no file")]
    EmptyFile { source_name: String },

    #[error("source `{source_name}` declares no columns")]
    NoColumns { source_name: String },

    #[error("source `{source_name}` lists raw column `{raw}` more than once")]
    DuplicateRawColumn { source_name: String, raw: String },

    #[error(
        "source `{source_name}` maps both `{first_raw}` and `{second_raw}` to canonical column `{column}`"
    )]
    NonInjectiveRename {
        source_name: String,
        column: String,
        first_raw: String,
        second_raw: String,
    },

    #[error("source `{source_name}` must declare exactly one of primary_key or foreign_key")]
    AmbiguousKeyRole { source_name: String },

    #[error("source `{source_name}` declares an empty key")]
    EmptyKey { source_name: String },

    #[error("source `{source_name}` key column `{column}` is not a declared column")]
    UnknownKeyColumn { source_name: String, column: String },

    #[error("source `{source_name}` fill value {value:?} for `{column}` is not a valid {kind}")]
    InvalidFill {
        source_name: String,
        column: String,
        value: String,
        kind: ColumnType,
    },

    #[error("merge plan references unknown source `{name}`")]
    UnknownSource { name: String },

    #[error("merge plan uses source `{name}` more than once")]
    DuplicateJoin { name: String },

    #[error("source `{name}` is not part of the merge plan")]
    UnmergedSource { name: String },

    #[error("join with `{source_name}` uses column `{column}` missing on one side")]
    UnknownJoinColumn { source_name: String, column: String },

    #[error("merge key column `{column}` is not a column of base source `{base}`")]
    UnknownMergeKeyColumn { base: String, column: String },

    #[error("join with `{source_name}` would add column `{column}` which is already present")]
    ColumnCollision { source_name: String, column: String },
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn model(source_name: &str, source: ModelError) -> Self {
        Self::Model {
            source_name: source_name.to_string(),
            source,
        }
    }
}
