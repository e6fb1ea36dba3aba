#![deny(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use ehr_model::{CellValue, Column, ColumnName, ColumnType};

use crate::error::SchemaError;
use crate::manifest::{
    ColumnEntry, JoinEntry, MergeEntry, REGISTRY_SCHEMA, REGISTRY_SCHEMA_VERSION, RegistryFile,
    SourceEntry,
};

const DEFAULT_REGISTRY_TOML: &str = include_str!("../registry/default.toml");

/// One declared column: raw header, canonical name, type, and optional fill literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub raw: String,
    pub name: ColumnName,
    pub kind: ColumnType,
    pub fill: Option<CellValue>,
}

impl ColumnSpec {
    pub fn new(raw: impl Into<String>, name: ColumnName, kind: ColumnType) -> Self {
        Self {
            raw: raw.into(),
            name,
            kind,
            fill: None,
        }
    }

    #[must_use]
    pub fn with_fill(mut self, fill: CellValue) -> Self {
        self.fill = Some(fill);
        self
    }

    pub fn column(&self) -> Column {
        Column::new(self.name.clone(), self.kind)
    }
}

/// Key role of a source: a root table with a primary key, or a child table
/// linked to its parent by a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRole {
    Primary(Vec<ColumnName>),
    Foreign(Vec<ColumnName>),
}

impl KeyRole {
    pub fn columns(&self) -> &[ColumnName] {
        match self {
            Self::Primary(columns) | Self::Foreign(columns) => columns,
        }
    }

    pub fn is_child(&self) -> bool {
        matches!(self, Self::Foreign(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Primary(_) => "primary",
            Self::Foreign(_) => "foreign",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    pub file: PathBuf,
    pub columns: Vec<ColumnSpec>,
    pub key: KeyRole,
}

impl SourceSpec {
    pub fn primary_key(&self) -> Option<&[ColumnName]> {
        match &self.key {
            KeyRole::Primary(columns) => Some(columns),
            KeyRole::Foreign(_) => None,
        }
    }

    pub fn foreign_key(&self) -> Option<&[ColumnName]> {
        match &self.key {
            KeyRole::Foreign(columns) => Some(columns),
            KeyRole::Primary(_) => None,
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Canonical columns outside the declared key, in declaration order.
    pub fn value_columns(&self) -> Vec<ColumnName> {
        let key = self.key.columns();
        self.columns
            .iter()
            .filter(|column| !key.contains(&column.name))
            .map(|column| column.name.clone())
            .collect()
    }

    /// Column order of the table once it is ready to merge: declaration order
    /// for root tables, key columns first for aggregated child tables.
    pub fn prepared_columns(&self) -> Vec<ColumnName> {
        match &self.key {
            KeyRole::Primary(_) => self.columns.iter().map(|c| c.name.clone()).collect(),
            KeyRole::Foreign(key) => {
                let mut columns = key.clone();
                columns.extend(self.value_columns());
                columns
            }
        }
    }

    /// Per-column imputation overrides.
    pub fn impute_overrides(&self) -> BTreeMap<ColumnName, CellValue> {
        self.columns
            .iter()
            .filter_map(|column| Some((column.name.clone(), column.fill.clone()?)))
            .collect()
    }

    /// Checks the rename map is injective and the key refers to declared columns.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.file.as_os_str().is_empty() {
            return Err(SchemaError::EmptyFile {
                source_name: self.name.clone(),
            });
        }
        if self.columns.is_empty() {
            return Err(SchemaError::NoColumns {
                source_name: self.name.clone(),
            });
        }
        let mut raw_seen = BTreeSet::new();
        let mut canonical_seen: BTreeMap<&str, &str> = BTreeMap::new();
        for column in &self.columns {
            if !raw_seen.insert(column.raw.as_str()) {
                return Err(SchemaError::DuplicateRawColumn {
                    source_name: self.name.clone(),
                    raw: column.raw.clone(),
                });
            }
            if let Some(first_raw) = canonical_seen.insert(column.name.as_str(), &column.raw) {
                return Err(SchemaError::NonInjectiveRename {
                    source_name: self.name.clone(),
                    column: column.name.to_string(),
                    first_raw: first_raw.to_string(),
                    second_raw: column.raw.clone(),
                });
            }
        }
        let key = self.key.columns();
        if key.is_empty() {
            return Err(SchemaError::EmptyKey {
                source_name: self.name.clone(),
            });
        }
        for column in key {
            if self.column(column.as_str()).is_none() {
                return Err(SchemaError::UnknownKeyColumn {
                    source_name: self.name.clone(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub source: String,
    pub on: Vec<ColumnName>,
}

/// Order and keys of the left joins that build the merged dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub base: String,
    pub joins: Vec<JoinSpec>,
    /// Terminal key that must be unique in the merged output.
    pub key: Vec<ColumnName>,
}

/// Immutable description of every source and how they merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    sources: Vec<SourceSpec>,
    merge: MergePlan,
}

impl Registry {
    pub fn new(sources: Vec<SourceSpec>, merge: MergePlan) -> Result<Self, SchemaError> {
        let registry = Self { sources, merge };
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_toml_str(contents: &str, origin: &str) -> Result<Self, SchemaError> {
        let file: RegistryFile = toml::from_str(contents).map_err(|source| SchemaError::Toml {
            origin: origin.to_string(),
            source,
        })?;
        Self::from_file(file)
    }

    pub fn from_toml_path(path: &Path) -> Result<Self, SchemaError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
        Self::from_toml_str(&contents, &path.display().to_string())
    }

    fn from_file(file: RegistryFile) -> Result<Self, SchemaError> {
        if file.registry.schema != REGISTRY_SCHEMA {
            return Err(SchemaError::InvalidManifest {
                message: format!(
                    "expected schema {REGISTRY_SCHEMA:?}, found {:?}",
                    file.registry.schema
                ),
            });
        }
        if file.registry.schema_version != REGISTRY_SCHEMA_VERSION {
            return Err(SchemaError::InvalidManifest {
                message: format!(
                    "unsupported schema_version {} (expected {REGISTRY_SCHEMA_VERSION})",
                    file.registry.schema_version
                ),
            });
        }
        let sources = file
            .sources
            .into_iter()
            .map(source_from_entry)
            .collect::<Result<Vec<_>, _>>()?;
        let merge = merge_from_entry(file.merge)?;
        Self::new(sources, merge)
    }

    pub fn sources(&self) -> &[SourceSpec] {
        &self.sources
    }

    pub fn source(&self, name: &str) -> Option<&SourceSpec> {
        self.sources.iter().find(|source| source.name == name)
    }

    pub fn merge_plan(&self) -> &MergePlan {
        &self.merge
    }

    pub fn child_sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.sources.iter().filter(|source| source.key.is_child())
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let mut names = BTreeSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(SchemaError::DuplicateSource {
                    name: source.name.clone(),
                });
            }
            source.validate()?;
        }
        self.validate_merge_plan()
    }

    fn validate_merge_plan(&self) -> Result<(), SchemaError> {
        let plan = &self.merge;
        let base = self.require_source(&plan.base)?;
        for column in &plan.key {
            if base.column(column.as_str()).is_none() {
                return Err(SchemaError::UnknownMergeKeyColumn {
                    base: base.name.clone(),
                    column: column.to_string(),
                });
            }
        }

        let mut used = BTreeSet::from([base.name.as_str()]);
        let mut merged: Vec<ColumnName> = base.prepared_columns();
        for join in &plan.joins {
            let right = self.require_source(&join.source)?;
            if !used.insert(right.name.as_str()) {
                return Err(SchemaError::DuplicateJoin {
                    name: right.name.clone(),
                });
            }
            for column in &join.on {
                if !merged.contains(column) || right.column(column.as_str()).is_none() {
                    return Err(SchemaError::UnknownJoinColumn {
                        source_name: right.name.clone(),
                        column: column.to_string(),
                    });
                }
            }
            for column in right.prepared_columns() {
                if join.on.contains(&column) {
                    continue;
                }
                if merged.contains(&column) {
                    return Err(SchemaError::ColumnCollision {
                        source_name: right.name.clone(),
                        column: column.to_string(),
                    });
                }
                merged.push(column);
            }
        }

        if let Some(unmerged) = self
            .sources
            .iter()
            .find(|source| !used.contains(source.name.as_str()))
        {
            return Err(SchemaError::UnmergedSource {
                name: unmerged.name.clone(),
            });
        }
        Ok(())
    }

    fn require_source(&self, name: &str) -> Result<&SourceSpec, SchemaError> {
        self.source(name).ok_or_else(|| SchemaError::UnknownSource {
            name: name.to_string(),
        })
    }
}

/// The built-in registry describing the patient, encounter and six child extracts.
pub fn default_registry() -> Result<Registry, SchemaError> {
    Registry::from_toml_str(DEFAULT_REGISTRY_TOML, "built-in registry")
}

fn source_from_entry(entry: SourceEntry) -> Result<SourceSpec, SchemaError> {
    let name = entry.name;
    let columns = entry
        .columns
        .into_iter()
        .map(|column| column_from_entry(&name, column))
        .collect::<Result<Vec<_>, _>>()?;
    let key = match (entry.primary_key, entry.foreign_key) {
        (Some(primary), None) => KeyRole::Primary(names(&name, primary)?),
        (None, Some(foreign)) => KeyRole::Foreign(names(&name, foreign)?),
        _ => return Err(SchemaError::AmbiguousKeyRole { source_name: name }),
    };
    Ok(SourceSpec {
        name,
        file: PathBuf::from(entry.file),
        columns,
        key,
    })
}

fn column_from_entry(source_name: &str, entry: ColumnEntry) -> Result<ColumnSpec, SchemaError> {
    let name = ColumnName::new(entry.name).map_err(|e| SchemaError::model(source_name, e))?;
    let mut spec = ColumnSpec::new(entry.raw, name, entry.kind);
    if let Some(literal) = entry.fill {
        let fill = match CellValue::parse(&literal, entry.kind) {
            Ok(value) if !value.is_missing() => value,
            _ => {
                return Err(SchemaError::InvalidFill {
                    source_name: source_name.to_string(),
                    column: spec.name.to_string(),
                    value: literal,
                    kind: entry.kind,
                });
            }
        };
        spec = spec.with_fill(fill);
    }
    Ok(spec)
}

fn merge_from_entry(entry: MergeEntry) -> Result<MergePlan, SchemaError> {
    let key = names("merge", entry.key)?;
    let joins = entry
        .joins
        .into_iter()
        .map(|JoinEntry { source, on }| {
            let on = names(&source, on)?;
            Ok(JoinSpec { source, on })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;
    Ok(MergePlan {
        base: entry.base,
        joins,
        key,
    })
}

fn names(source_name: &str, raw: Vec<String>) -> Result<Vec<ColumnName>, SchemaError> {
    ehr_model::column_names(raw).map_err(|e| SchemaError::model(source_name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_is_valid() {
        let registry = default_registry().unwrap();
        assert_eq!(registry.sources().len(), 8);
        assert_eq!(registry.child_sources().count(), 6);
        assert_eq!(registry.merge_plan().base, "encounter");
        assert_eq!(registry.merge_plan().joins[0].source, "patient");

        let patient = registry.source("patient").unwrap();
        assert_eq!(patient.primary_key().unwrap(), &[ColumnName::new("patient_id").unwrap()]);
        assert_eq!(patient.column("birthdate").unwrap().kind, ColumnType::Date);
    }

    #[test]
    fn child_prepared_columns_put_key_first() {
        let registry = default_registry().unwrap();
        let conditions = registry.source("conditions").unwrap();
        let prepared: Vec<String> = conditions
            .prepared_columns()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            prepared,
            ["patient_id", "encounter_id", "condition_code", "condition_description"]
        );
        assert_eq!(conditions.value_columns().len(), 2);
    }
}
