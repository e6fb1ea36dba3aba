//! Table Loader: reads one raw CSV extract per registry source.

pub mod error;
pub mod loader;

pub use error::IngestError;
pub use loader::{LoadSummary, LoadedSource, load_source, read_text_table};
