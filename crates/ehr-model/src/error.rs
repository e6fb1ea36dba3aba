use thiserror::Error;

use crate::ColumnType;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid column name: {0:?}")]
    InvalidColumnName(String),

    #[error("unknown column `{column}` in table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("row has {actual} cells but table `{table}` has {expected} columns")]
    RowArity {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("value {value:?} is not a valid {kind}")]
    InvalidValue { kind: ColumnType, value: String },
}
