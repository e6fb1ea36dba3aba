use ehr_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("table `{table}` already has a `{column}` column")]
    ColumnExists { table: String, column: String },
}
