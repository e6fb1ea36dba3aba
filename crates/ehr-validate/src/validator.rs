//! Terminal uniqueness gate.
//!
//! A merged dataset may only be published when every row carries a distinct
//! (patient, encounter) key tuple. A violation means an upstream join matched
//! more than one right-hand row for some key, typically a child table that
//! was not aggregated to one row per key.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info};

use ehr_model::{ColumnName, KeyTuple, ModelError, Table};

/// Number of offending keys kept on a violation for diagnostics.
const MAX_EXAMPLES: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(
        "duplicate key violation in `{table}`: {count} row(s) repeat an earlier ({key}) key tuple"
    )]
    DuplicateKeyViolation {
        table: String,
        key: String,
        count: usize,
        /// A few offending key tuples, rendered. May contain identifiers.
        examples: Vec<String>,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Outcome of a passing uniqueness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniquenessReport {
    pub table: String,
    pub key: Vec<String>,
    pub rows: usize,
    pub duplicates: usize,
}

/// Counts rows whose key tuple already appeared in an earlier row.
pub fn duplicate_key_count(table: &Table, key: &[ColumnName]) -> Result<usize, ModelError> {
    Ok(duplicate_groups(table, key)?
        .values()
        .map(|occurrences| occurrences - 1)
        .sum())
}

fn duplicate_groups(
    table: &Table,
    key: &[ColumnName],
) -> Result<BTreeMap<KeyTuple, usize>, ModelError> {
    let mut counts: BTreeMap<KeyTuple, usize> = BTreeMap::new();
    for tuple in table.key_tuples(key)? {
        *counts.entry(tuple).or_insert(0) += 1;
    }
    counts.retain(|_, occurrences| *occurrences > 1);
    Ok(counts)
}

/// Fails with [`ValidationError::DuplicateKeyViolation`] when any key tuple
/// occurs more than once.
pub fn validate_unique_keys(
    table: &Table,
    key: &[ColumnName],
) -> Result<UniquenessReport, ValidationError> {
    let groups = duplicate_groups(table, key)?;
    let count: usize = groups.values().map(|occurrences| occurrences - 1).sum();
    let key_label = key
        .iter()
        .map(ColumnName::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if count > 0 {
        error!(
            table = %table.name,
            key = %key_label,
            duplicates = count,
            "duplicate key violation"
        );
        return Err(ValidationError::DuplicateKeyViolation {
            table: table.name.clone(),
            key: key_label,
            count,
            examples: groups
                .keys()
                .take(MAX_EXAMPLES)
                .map(ToString::to_string)
                .collect(),
        });
    }
    info!(table = %table.name, rows = table.height(), "key uniqueness verified");
    Ok(UniquenessReport {
        table: table.name.clone(),
        key: key.iter().map(ToString::to_string).collect(),
        rows: table.height(),
        duplicates: 0,
    })
}
