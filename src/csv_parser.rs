//! CSV ingestion with automatic column role inference.
//!
//! Parses survey exports into a [`DataFrame`]. Each column is classified
//! with [`classify_values`] after null markers are removed: numeric columns
//! become `f64`, low-cardinality strings are dictionary-encoded, the rest
//! are kept as free text.
//!
//! # Features
//!
//! - RFC 4180 quoting via the `csv` crate (quoted commas, escaped quotes, embedded newlines)
//! - Standard null markers recognized: empty, `NA`, `N/A`, `null`, `NULL`, `None`, `NaN`, ...
//! - Configurable delimiter, header handling and null markers
//! - UTF-8 byte order mark stripped
//!
//! # Example
//!
//! ```
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::classify::ColumnRole;
//!
//! let csv = "name,age,gender\nAlice,21,F\nBob,34,M\nCara,29,F\nDan,41,M\nEve,25,F\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! assert_eq!(df.row_count(), 5);
//! assert_eq!(df.column(0).unwrap().role(), ColumnRole::Text);
//! assert_eq!(df.column(1).unwrap().role(), ColumnRole::Numeric);
//! assert_eq!(df.column(2).unwrap().role(), ColumnRole::Categorical);
//! ```

use std::path::Path;

use crate::classify::{classify_values, parse_numeric, ColumnRole};
use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, SurveyError};

/// Standard null value markers recognized during parsing.
const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "NA", "N/A", "na", "n/a", "null", "NULL", "None", "none", "NaN", "nan", "NAN", "#N/A",
    "#NA",
];

/// CSV parser configuration and entry point.
#[derive(Debug, Clone)]
pub struct CsvParser {
    delimiter: u8,
    has_header: bool,
    null_markers: Vec<String>,
}

impl CsvParser {
    /// Creates a parser with comma delimiter, header row and standard null markers.
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            null_markers: DEFAULT_NULL_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Sets the field delimiter (default: comma).
    pub fn delimiter(mut self, delim: u8) -> Self {
        self.delimiter = delim;
        self
    }

    /// Sets whether the first row is a header (default: true).
    pub fn has_header(mut self, header: bool) -> Self {
        self.has_header = header;
        self
    }

    /// Replaces the null markers.
    pub fn null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Parses CSV text into a DataFrame.
    pub fn parse_str(&self, input: &str) -> Result<DataFrame> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(false)
            .from_reader(input.as_bytes());

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Ok(DataFrame::new());
        }

        let headers: Vec<String> = if self.has_header {
            rows.remove(0)
        } else {
            (0..rows[0].len()).map(|i| format!("col_{i}")).collect()
        };

        let n_cols = headers.len();
        let mut raw_columns: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); n_cols];
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(SurveyError::CsvParse {
                    line: row_idx + if self.has_header { 2 } else { 1 },
                    message: format!("expected {n_cols} fields, got {}", row.len()),
                });
            }
            for (col_idx, field) in row.iter().enumerate() {
                let trimmed = field.trim();
                raw_columns[col_idx].push((!self.is_null(trimmed)).then(|| trimmed.to_string()));
            }
        }

        let mut df = DataFrame::new();
        for (name, raw) in headers.into_iter().zip(raw_columns) {
            df.add_column(name, build_column(&raw))?;
        }
        log::debug!(
            "parsed CSV: {} rows x {} columns",
            df.row_count(),
            df.column_count()
        );
        Ok(df)
    }

    /// Parses a CSV file from disk.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content)
    }

    fn is_null(&self, trimmed: &str) -> bool {
        self.null_markers.iter().any(|m| m == trimmed)
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Infers the role of raw cell values and builds the typed column.
///
/// Shared with the Excel reader.
pub(crate) fn build_column(raw: &[Option<String>]) -> Column {
    match classify_values(raw) {
        ColumnRole::Numeric => {
            let nums: Vec<Option<f64>> = raw
                .iter()
                .map(|v| v.as_deref().and_then(parse_numeric))
                .collect();
            Column::from_numbers(&nums)
        }
        ColumnRole::Categorical => Column::from_categories(raw),
        ColumnRole::Text => Column::from_texts(raw),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
