//! Tabular source loading
//!
//! A `Table` is an in-memory record set read from a delimited file. Cells are
//! trimmed and empty cells become `None`, so "missing" has a single
//! representation for every consumer.

use crate::error::{CubeError, CubeResult};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub type Record = Vec<Option<String>>;

/// An in-memory delimited table with a header row.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Record>,
}

impl Table {
    /// Read a delimited file. The table is named after the file.
    pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> CubeResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path)?;
        Self::from_reader(name, file, delimiter)
    }

    pub fn from_reader<R: Read>(
        name: impl Into<String>,
        reader: R,
        delimiter: u8,
    ) -> CubeResult<Self> {
        let name = name.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|source| CubeError::Csv {
                table: name.clone(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|source| CubeError::Csv {
                table: name.clone(),
                source,
            })?;
            rows.push(
                record
                    .iter()
                    .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                    .collect(),
            );
        }

        tracing::debug!(table = %name, columns = headers.len(), rows = rows.len(), "table loaded");
        Ok(Self::from_parts(name, headers, rows))
    }

    /// Build a table from already materialized rows.
    pub fn from_rows<H, R, C>(name: impl Into<String>, headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = Option<&'static str>>,
    {
        let headers = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|cell| cell.map(str::to_string)).collect())
            .collect();
        Self::from_parts(name.into(), headers, rows)
    }

    fn from_parts(name: String, headers: Vec<String>, rows: Vec<Record>) -> Self {
        // First occurrence wins for duplicated header names.
        let mut index = HashMap::with_capacity(headers.len());
        for (position, header) in headers.iter().enumerate() {
            index.entry(header.clone()).or_insert(position);
        }
        Self {
            name,
            headers,
            index,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter()
    }

    /// Fail with `MalformedSource` unless every column is present.
    pub fn require(&self, columns: &[&str]) -> CubeResult<()> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|column| !self.index.contains_key(*column))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CubeError::malformed(
                &self.name,
                format!("missing required column(s): {}", missing.join(", ")),
            ))
        }
    }

    pub fn column(&self, column: &str) -> CubeResult<usize> {
        self.index.get(column).copied().ok_or_else(|| {
            CubeError::malformed(&self.name, format!("missing required column: {column}"))
        })
    }

    /// Resolve several columns at once, reporting all missing ones together.
    pub fn columns(&self, columns: &[&str]) -> CubeResult<Vec<usize>> {
        self.require(columns)?;
        columns.iter().map(|column| self.column(column)).collect()
    }
}

/// Cell accessor that tolerates short rows.
pub fn cell(record: &Record, column: usize) -> Option<&str> {
    record.get(column).and_then(|value| value.as_deref())
}
