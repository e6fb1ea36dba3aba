//! Validation of the merged dataset before it is published.

pub mod validator;

pub use validator::{
    UniquenessReport, ValidationError, duplicate_key_count, validate_unique_keys,
};
