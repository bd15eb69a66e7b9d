// Tabular format parsers
//
// Each parser turns decoded provider text into an ordered sequence of flat
// rows. Rows from one parse share a single column list.

pub mod delimited;
pub mod fixed_width;
pub mod json_records;
pub mod station_text;

use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, instrument};

pub use delimited::write_delimited;

/// One flat record: ordered column name -> raw string value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    /// Rows of one parse clone the same `columns` handle
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a standalone row, mostly useful for callers and tests
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Wire layouts understood by [`parse_table`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Header + dash separator + column-aligned lines (MOSMIX station catalog)
    FixedWidth,
    /// Semicolon-separated header CSV (10-minute climate series)
    Delimited,
    /// Whitespace-tokenized DWD station description file
    StationText,
    /// PEGELONLINE JSON objects, nested keys flattened with dots
    JsonRecords,
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("Missing header line")]
    MissingHeader,

    #[error("Missing or malformed dash separator line: {0:?}")]
    MissingSeparator(String),

    #[error("Separator defines {columns} columns but header names {headers}")]
    HeaderMismatch { headers: usize, columns: usize },

    #[error("Malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON payload is not an object or an array of objects")]
    NotRecords,
}

/// Parse decoded text into rows according to `format`
#[instrument(skip(text), fields(text_size = text.len()))]
pub fn parse_table(text: &str, format: TableFormat) -> Result<Vec<Row>, TableError> {
    let rows = match format {
        TableFormat::FixedWidth => fixed_width::parse(text)?,
        TableFormat::Delimited => delimited::parse(text)?,
        TableFormat::StationText => station_text::parse(text)?,
        TableFormat::JsonRecords => json_records::parse(text)?,
    };
    debug!("Parsed {} rows", rows.len());
    Ok(rows)
}
