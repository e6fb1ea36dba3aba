//! Typed cell values and the sentinels used to replace missing ones.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::ModelError;

/// Placeholder for missing textual values.
pub const SENTINEL_TEXT: &str = "Unknown";

/// Placeholder for missing numeric values.
pub const SENTINEL_NUMBER: f64 = 0.0;

/// Placeholder for missing dates: the earliest date the registry supports.
pub const SENTINEL_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1900, 1, 1) {
    Some(date) => date,
    None => panic!("1900-01-01 is a valid calendar date"),
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Declared type of a column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    #[default]
    Text,
    Date,
}

impl ColumnType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Date => "date",
        }
    }

    /// The value the imputer writes into a missing cell when no override exists.
    pub fn default_fill(self) -> CellValue {
        match self {
            Self::Numeric => CellValue::Number(SENTINEL_NUMBER),
            Self::Date => CellValue::Date(SENTINEL_DATE),
            Self::Text => CellValue::Text(SENTINEL_TEXT.to_string()),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell. `Missing` never compares equal to a present value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Date(NaiveDate),
    Missing,
}

impl CellValue {
    /// Parses a raw field according to the declared column type.
    ///
    /// Empty and whitespace-only fields become `Missing`.
    pub fn parse(raw: &str, kind: ColumnType) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Missing);
        }
        match kind {
            ColumnType::Text => Ok(Self::Text(trimmed.to_string())),
            ColumnType::Numeric => parse_number(trimmed)
                .map(Self::Number)
                .ok_or_else(|| invalid(kind, raw)),
            ColumnType::Date => parse_date(trimmed)
                .map(Self::Date)
                .ok_or_else(|| invalid(kind, raw)),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Renders the value the way it is written to output files.
    /// `Missing` renders as an empty field.
    pub fn render(&self) -> String {
        match self {
            Self::Number(value) => format_number(*value),
            Self::Text(value) => value.clone(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Missing => String::new(),
        }
    }

    /// Stringified form used for key matching; `None` for missing cells.
    pub fn key_part(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.render())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("<missing>"),
            other => f.write_str(&other.render()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

fn invalid(kind: ColumnType, raw: &str) -> ModelError {
    ModelError::InvalidValue {
        kind,
        value: raw.to_string(),
    }
}

/// Parses a finite number, returning None for invalid or empty strings.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parses `YYYY-MM-DD`, RFC 3339 timestamps, and naive ISO timestamps,
/// keeping only the calendar date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(datetime.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|datetime| datetime.date())
}

/// Formats a number without a trailing `.0` for whole values.
pub fn format_number(value: f64) -> String {
    format!("{value}")
}
