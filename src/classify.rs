//! Column role classification.
//!
//! A column is [`Numeric`](ColumnRole::Numeric) when every non-missing value
//! parses as a real number. Otherwise it is string-valued: low-cardinality
//! columns are [`Categorical`](ColumnRole::Categorical), the rest
//! [`Text`](ColumnRole::Text). Both string roles are eligible for frequency
//! tables and tokenization; the split only decides the storage layout.
//!
//! ```
//! use survey_insight::classify::{classify_values, ColumnRole};
//!
//! let ages = [Some("21"), None, Some("34.5")];
//! assert_eq!(classify_values(&ages), ColumnRole::Numeric);
//!
//! let gender = [Some("F"), Some("M"), Some("F"), Some("F"), Some("M")];
//! assert_eq!(classify_values(&gender), ColumnRole::Categorical);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum unique-value ratio for a string column to be classified as
/// Categorical instead of Text.
pub const CATEGORICAL_THRESHOLD: f64 = 0.5;

/// Maximum number of distinct values a categorical column may hold.
pub const MAX_CATEGORICAL_UNIQUE: usize = 1000;

/// Semantic role inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRole {
    /// Every non-missing value is a real number (stored as `f64`).
    Numeric,
    /// Low-cardinality strings (dictionary-encoded).
    Categorical,
    /// High-cardinality or free-form text.
    Text,
}

impl ColumnRole {
    /// Returns `true` for roles that hold numbers.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Numeric)
    }

    /// Returns `true` for string-valued roles, which are offered for both
    /// frequency tables and word tokenization.
    pub fn is_text_eligible(self) -> bool {
        matches!(self, Self::Categorical | Self::Text)
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric => write!(f, "Numeric"),
            Self::Categorical => write!(f, "Categorical"),
            Self::Text => write!(f, "Text"),
        }
    }
}

/// Returns `true` if `s` coerces to a real number.
pub fn is_numeric_str(s: &str) -> bool {
    parse_numeric(s).is_some()
}

/// Coerces a raw value to `f64`, the way a lenient numeric conversion does:
/// surrounding whitespace is ignored and anything unparseable is `None`.
/// Only finite numbers count; `inf`, `NaN` and overflowing literals do not.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Classifies a column from its raw values (`None` = missing).
///
/// An all-missing column has no evidence against being numeric and is
/// classified as Numeric.
pub fn classify_values<S: AsRef<str>>(values: &[Option<S>]) -> ColumnRole {
    let non_null: Vec<&str> = values
        .iter()
        .filter_map(|v| v.as_ref().map(|s| s.as_ref()))
        .collect();

    if non_null.iter().all(|s| is_numeric_str(s)) {
        return ColumnRole::Numeric;
    }

    let unique: HashSet<&str> = non_null.iter().copied().collect();
    let ratio = unique.len() as f64 / non_null.len() as f64;
    if ratio < CATEGORICAL_THRESHOLD && unique.len() <= MAX_CATEGORICAL_UNIQUE {
        ColumnRole::Categorical
    } else {
        ColumnRole::Text
    }
}
