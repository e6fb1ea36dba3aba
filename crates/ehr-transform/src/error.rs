use ehr_model::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("column `{column}` of `{table}` is both a key and a value column")]
    KeyValueOverlap { table: String, column: String },

    #[error("joining `{right}` into `{left}` would duplicate column `{column}`")]
    ColumnCollision {
        left: String,
        right: String,
        column: String,
    },
}
