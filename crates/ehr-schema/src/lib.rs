#![deny(unsafe_code)]

//! Schema registry: which files make up the dataset, how their columns are
//! renamed and typed, which keys they carry, and the order they are merged in.

pub mod error;
pub mod manifest;
pub mod registry;

pub use crate::error::SchemaError;
pub use crate::registry::{
    ColumnSpec, JoinSpec, KeyRole, MergePlan, Registry, SourceSpec, default_registry,
};
