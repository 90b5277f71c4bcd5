//! Frequency tables for one column.
//!
//! Missing answers form their own [`Category::Missing`] bucket, so counts
//! always add up to the number of rows and percentages to 100.
//!
//! ```
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::frequency::{frequency_table, Category};
//!
//! let df = CsvParser::new().parse_str("grade\nA\nA\nB\nNA\n").unwrap();
//! let table = frequency_table(&df, "grade").unwrap();
//! assert_eq!(table.entries[0].category, Category::Value("A".into()));
//! assert_eq!(table.entries[0].percent, 50.0);
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::dataframe::DataFrame;
use crate::error::Result;

/// A frequency-table bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// An observed value, rendered as a label.
    Value(String),
    /// Rows without an answer.
    Missing,
}

impl Category {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Missing => write!(f, "<missing>"),
        }
    }
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub category: Category,
    pub count: usize,
    /// `100 * count / total_rows`.
    pub percent: f64,
}

/// Count/percent breakdown of a column, descending by count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub column: String,
    /// Rows in the column, missing included.
    pub total_rows: usize,
    /// Descending by count; equal counts keep first-appearance order.
    pub entries: Vec<FrequencyEntry>,
}

impl FrequencyTable {
    /// The first `n` entries.
    pub fn top(&self, n: usize) -> &[FrequencyEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Entries for observed values only.
    pub fn non_missing(&self) -> impl Iterator<Item = &FrequencyEntry> {
        self.entries.iter().filter(|e| !e.category.is_missing())
    }

    /// Count of the missing bucket (0 when there is none).
    pub fn missing_count(&self) -> usize {
        self.entries
            .iter()
            .find(|e| e.category.is_missing())
            .map_or(0, |e| e.count)
    }

    /// Number of distinct observed values.
    pub fn distinct_count(&self) -> usize {
        self.non_missing().count()
    }
}

/// Builds the frequency table of `column`. Works for any column role;
/// numbers are bucketed by their label.
pub fn frequency_table(df: &DataFrame, column: &str) -> Result<FrequencyTable> {
    let col = df.require_column(column)?;
    let total_rows = col.len();

    // (first-seen position, count) per bucket
    let mut buckets: HashMap<Category, (usize, usize)> = HashMap::new();
    for i in 0..total_rows {
        let key = match col.label_at(i) {
            Some(label) => Category::Value(label.into_owned()),
            None => Category::Missing,
        };
        let next = buckets.len();
        buckets.entry(key).or_insert((next, 0)).1 += 1;
    }

    let mut ordered: Vec<(Category, usize, usize)> = buckets
        .into_iter()
        .map(|(cat, (first, count))| (cat, first, count))
        .collect();
    ordered.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));

    let entries = ordered
        .into_iter()
        .map(|(category, _, count)| FrequencyEntry {
            category,
            count,
            percent: 100.0 * count as f64 / total_rows as f64,
        })
        .collect();

    Ok(FrequencyTable {
        column: column.to_string(),
        total_rows,
        entries,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────
