#![deny(unsafe_code)]

//! On-disk TOML layout of a registry file.

use serde::{Deserialize, Serialize};

use ehr_model::ColumnType;

pub const REGISTRY_SCHEMA: &str = "ehr-merge.registry";
pub const REGISTRY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryFile {
    pub registry: RegistryHeader,
    pub sources: Vec<SourceEntry>,
    pub merge: MergeEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryHeader {
    pub schema: String,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub primary_key: Option<Vec<String>>,
    #[serde(default)]
    pub foreign_key: Option<Vec<String>>,
    pub columns: Vec<ColumnEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub raw: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: ColumnType,
    /// Literal written into missing cells instead of the type default.
    #[serde(default)]
    pub fill: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeEntry {
    pub base: String,
    pub key: Vec<String>,
    #[serde(default)]
    pub joins: Vec<JoinEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinEntry {
    pub source: String,
    pub on: Vec<String>,
}
