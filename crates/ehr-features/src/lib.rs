//! Feature Deriver: cleans a merged encounter dataset and appends
//! model-ready indicator, age and encounter-class columns.

pub mod derive;
pub mod error;

pub use derive::{
    CODE_INDICATORS, FeatureOptions, FeatureSummary, MAX_AGE, derive_features, has_code,
};
pub use error::FeatureError;
