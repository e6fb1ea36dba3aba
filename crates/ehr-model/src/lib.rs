//! Typed, row-oriented table model for the encounter dataset pipeline.

pub mod error;
pub mod ids;
pub mod table;
pub mod value;

pub use error::ModelError;
pub use ids::{ColumnName, column_names};
pub use table::{Column, KeyTuple, Row, Table};
pub use value::{
    CellValue, ColumnType, SENTINEL_DATE, SENTINEL_NUMBER, SENTINEL_TEXT, format_number,
    parse_date, parse_number,
};
