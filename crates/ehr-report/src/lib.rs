//! Diagnostics Reporter sinks and merged dataset output.

pub mod error;
pub mod output;
pub mod reporter;
pub mod snapshot;

pub use error::ReportError;
pub use output::{table_to_csv_string, write_table, write_table_csv};
pub use reporter::{
    CollectingReporter, ConsoleReporter, DiagnosticsReporter, JsonLinesReporter, NullReporter,
    TracingReporter,
};
pub use snapshot::{ColumnNulls, REDACTED_VALUE, TableSnapshot};
