//! Likert-scale scoring.
//!
//! Survey exports often store answers as `"4 - Agree"` or `"5 (Strongly
//! agree)"`. The score is the first integer in the answer. Composite scores
//! sum several items per respondent, and can be cut into quantile bins for a
//! chi-square test.
//!
//! ```
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::likert::composite_score;
//!
//! let df = CsvParser::new()
//!     .parse_str("q1,q2\n4 - Agree,5 - Strongly agree\n2 - Disagree,NA\nNA,NA\n")
//!     .unwrap();
//! let total = composite_score(&df, &["q1", "q2"]).unwrap();
//! assert_eq!(total.numeric_at(0), Some(9.0));
//! assert_eq!(total.numeric_at(1), Some(2.0));
//! assert_eq!(total.numeric_at(2), None);
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, SurveyError};

lazy_static! {
    static ref FIRST_INTEGER: Regex = Regex::new(r"\d+").expect("valid regex");
}

/// Allowed range for [`quantile_bins`].
pub const MIN_BINS: usize = 2;
pub const MAX_BINS: usize = 5;

/// Extracts the first run of digits in `answer`.
///
/// ```
/// use survey_insight::likert::likert_score;
///
/// assert_eq!(likert_score("5 = Strongly agree"), Some(5.0));
/// assert_eq!(likert_score("Agree (4)"), Some(4.0));
/// assert_eq!(likert_score("Neutral"), None);
/// ```
pub fn likert_score(answer: &str) -> Option<f64> {
    FIRST_INTEGER
        .find(answer)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Scores every row of `column` (numeric columns pass through).
pub fn likert_column(df: &DataFrame, column: &str) -> Result<Column> {
    let col = df.require_column(column)?;
    let scores: Vec<Option<f64>> = if col.role().is_numeric() {
        col.coerce_numeric()
    } else {
        (0..col.len())
            .map(|i| col.str_at(i).and_then(likert_score))
            .collect()
    };
    Ok(Column::from_numbers(&scores))
}

/// Row-wise sum of the item scores. A row with no scored item is missing;
/// otherwise unscored items count as absent, not zero.
pub fn composite_score<S: AsRef<str>>(df: &DataFrame, items: &[S]) -> Result<Column> {
    if items.is_empty() {
        return Err(SurveyError::InvalidSelection {
            column: String::new(),
            reason: "composite score needs at least one item".to_string(),
        });
    }
    let scored: Vec<Column> = items
        .iter()
        .map(|item| likert_column(df, item.as_ref()))
        .collect::<Result<_>>()?;

    let totals: Vec<Option<f64>> = (0..df.row_count())
        .map(|row| {
            scored
                .iter()
                .filter_map(|col| col.numeric_at(row))
                .fold(None, |acc: Option<f64>, v| Some(acc.unwrap_or(0.0) + v))
        })
        .collect();
    Ok(Column::from_numbers(&totals))
}

/// Returns a copy of `df` with the composite of `items` appended as `name`.
pub fn with_composite_score<S: AsRef<str>>(
    df: &DataFrame,
    name: &str,
    items: &[S],
) -> Result<DataFrame> {
    let total = composite_score(df, items)?;
    let mut out = df.clone();
    out.add_column(name.to_string(), total)?;
    log::debug!(
        "added composite '{name}' over {} items ({} rows missing)",
        items.len(),
        out.column_by_name(name).map_or(0, Column::null_count)
    );
    Ok(out)
}

// ── Quantile bins ─────────────────────────────────────────────────────

/// A numeric column cut into quantile groups.
#[derive(Debug, Clone)]
pub struct QuantileBins {
    /// Categorical column with labels `Q1`, `Q2`, ...; missing stays missing.
    pub column: Column,
    /// Distinct bin edges, ascending; `edges.len() - 1` bins.
    pub edges: Vec<f64>,
}

/// Cuts `column` into `bins` groups of roughly equal size.
///
/// Edges that coincide are merged, so heavily tied data may yield fewer
/// groups. The lowest edge is inclusive, every bin includes its upper edge.
///
/// ```
/// use survey_insight::csv_parser::CsvParser;
/// use survey_insight::likert::quantile_bins;
///
/// let df = CsvParser::new().parse_str("x\n1\n2\n3\n4\n5\n6\n").unwrap();
/// let binned = quantile_bins(&df, "x", 3).unwrap();
/// assert_eq!(binned.column.str_at(0), Some("Q1"));
/// assert_eq!(binned.column.str_at(5), Some("Q3"));
/// ```
pub fn quantile_bins(df: &DataFrame, column: &str, bins: usize) -> Result<QuantileBins> {
    if !(MIN_BINS..=MAX_BINS).contains(&bins) {
        return Err(SurveyError::InvalidSelection {
            column: column.to_string(),
            reason: format!("bin count must be between {MIN_BINS} and {MAX_BINS}, got {bins}"),
        });
    }
    let col = df.require_column(column)?;
    let values = col.coerce_numeric();
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return Err(SurveyError::NoData {
            column: column.to_string(),
        });
    }

    let no_data = || SurveyError::NoData {
        column: column.to_string(),
    };
    let mut edges: Vec<f64> = vec![u_numflow::stats::min(&present).ok_or_else(no_data)?];
    for k in 1..=bins {
        let q = if k == bins {
            u_numflow::stats::max(&present)
        } else {
            u_numflow::stats::quantile(&present, k as f64 / bins as f64)
        }
        .ok_or_else(no_data)?;
        if edges.last().map_or(true, |&last| q > last) {
            edges.push(q);
        }
    }
    if edges.len() < 2 {
        return Err(SurveyError::undefined(format!(
            "'{column}' is constant and cannot be binned"
        )));
    }

    let labels: Vec<Option<String>> = values
        .iter()
        .map(|v| v.map(|x| format!("Q{}", bin_index(&edges, x) + 1)))
        .collect();
    Ok(QuantileBins {
        column: Column::from_categories(&labels),
        edges,
    })
}

fn bin_index(edges: &[f64], x: f64) -> usize {
    let last = edges.len() - 2;
    (0..=last).find(|&i| x <= edges[i + 1]).unwrap_or(last)
}

// ── Tests ─────────────────────────────────────────────────────────────
