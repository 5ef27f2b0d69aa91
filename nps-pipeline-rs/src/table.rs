//! Survey table
//!
//! A minimal in-memory table of string cells read from and written to CSV.
//! Rows shorter than the header are padded with empty cells; longer rows
//! are cut to the header width.

use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// How missing values of a column are normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-empty value parses as a number; missing becomes `0`
    Numeric,
    /// Anything else; missing becomes the empty string
    Text,
}

impl ColumnKind {
    pub fn missing_value(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "0",
            ColumnKind::Text => "",
        }
    }
}

/// Parse a numeric cell, accepting a decimal comma
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>()
        .ok()
        .or_else(|| cell.replace(',', ".").parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SurveyTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Read a CSV file with a header row
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| PipelineError::io(path.display().to_string(), e))?;
        let table = Self::from_reader(file)?;
        log::info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| PipelineError::io(parent.display().to_string(), e))?;
        }
        let file = std::fs::File::create(path)
            .map_err(|e| PipelineError::io(path.display().to_string(), e))?;
        self.write_to(file)?;
        log::info!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .map_err(|e| PipelineError::io("csv output", e))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell value, empty when the row is short
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Keep only the first `n` rows
    pub fn head(&self, n: usize) -> Self {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Infer the kind of every column from its non-empty values
    ///
    /// A column with no values at all is text.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.headers.len())
            .map(|col| {
                let mut values = self
                    .rows
                    .iter()
                    .map(|row| row[col].as_str())
                    .filter(|v| !v.trim().is_empty())
                    .peekable();
                if values.peek().is_none() {
                    return ColumnKind::Text;
                }
                if values.all(|v| parse_number(v).is_some()) {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                }
            })
            .collect()
    }

    /// Copy with missing values filled per column kind
    ///
    /// Columns listed in `force_text` are always text and columns listed in
    /// `force_numeric` are always numeric, whatever their values look like.
    /// A cell holding only whitespace counts as missing.
    pub fn normalized(&self, force_text: &[usize], force_numeric: &[usize]) -> Self {
        let kinds: Vec<ColumnKind> = self
            .column_kinds()
            .into_iter()
            .enumerate()
            .map(|(i, kind)| {
                if force_text.contains(&i) {
                    ColumnKind::Text
                } else if force_numeric.contains(&i) {
                    ColumnKind::Numeric
                } else {
                    kind
                }
            })
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&kinds)
                    .map(|(cell, kind)| {
                        if cell.trim().is_empty() {
                            kind.missing_value().to_string()
                        } else {
                            cell.clone()
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            headers: self.headers.clone(),
            rows,
        }
    }
}
