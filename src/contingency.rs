//! Cross-tabulation and the chi-square test of independence.
//!
//! Rows missing a value in either column are left out of the table, unlike
//! [`frequency_table`](crate::frequency::frequency_table) which keeps a
//! missing bucket. Labels are sorted: numeric columns by value, string
//! columns lexicographically.
//!
//! # Example
//!
//! ```
//! use survey_insight::config::AnalysisConfig;
//! use survey_insight::contingency::{chi_square, AssociationVerdict};
//! use survey_insight::csv_parser::CsvParser;
//!
//! let mut csv = String::from("group,answer\n");
//! for _ in 0..10 { csv.push_str("a,yes\nb,no\n"); }
//! let df = CsvParser::new().parse_str(&csv).unwrap();
//!
//! let config = AnalysisConfig::default();
//! let result = chi_square(&df, "group", "answer", &config).unwrap();
//! assert_eq!(result.dof, 1);
//! assert!((result.statistic - 16.2).abs() < 1e-9); // Yates-corrected
//! assert_eq!(result.verdict(&config), AssociationVerdict::Significant);
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::config::AnalysisConfig;
use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, SurveyError};

// ── Contingency table ─────────────────────────────────────────────────

/// Observed joint counts of two columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub row_variable: String,
    pub col_variable: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `observed[i][j]` counts rows with `row_labels[i]` and `col_labels[j]`.
    pub observed: Vec<Vec<usize>>,
}

impl ContingencyTable {
    pub fn row_totals(&self) -> Vec<usize> {
        self.observed.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<usize> {
        (0..self.col_labels.len())
            .map(|j| self.observed.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> usize {
        self.observed.iter().flatten().sum()
    }

    /// Each cell as a percentage of its row total (rows summing to 0 stay 0).
    ///
    /// ```
    /// use survey_insight::contingency::ContingencyTable;
    ///
    /// let table = ContingencyTable {
    ///     row_variable: "g".into(),
    ///     col_variable: "a".into(),
    ///     row_labels: vec!["x".into(), "y".into()],
    ///     col_labels: vec!["no".into(), "yes".into()],
    ///     observed: vec![vec![1, 3], vec![2, 2]],
    /// };
    /// assert_eq!(table.row_percentages(), vec![vec![25.0, 75.0], vec![50.0, 50.0]]);
    /// ```
    pub fn row_percentages(&self) -> Vec<Vec<f64>> {
        self.observed
            .iter()
            .map(|row| {
                let total: usize = row.iter().sum();
                row.iter()
                    .map(|&c| {
                        if total == 0 {
                            0.0
                        } else {
                            100.0 * c as f64 / total as f64
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Expected counts under independence: row total × column total / grand total.
    pub fn expected(&self) -> Vec<Vec<f64>> {
        let rows = self.row_totals();
        let cols = self.col_totals();
        let n = self.grand_total() as f64;
        rows.iter()
            .map(|&r| cols.iter().map(|&c| r as f64 * c as f64 / n).collect())
            .collect()
    }

    /// (rows − 1) × (columns − 1).
    pub fn dof(&self) -> usize {
        self.row_labels.len().saturating_sub(1) * self.col_labels.len().saturating_sub(1)
    }

    /// Checks that `observed` is `row_labels.len()` × `col_labels.len()`.
    pub fn check_shape(&self) -> Result<()> {
        if self.observed.len() != self.row_labels.len() {
            return Err(SurveyError::DimensionMismatch {
                expected: self.row_labels.len(),
                actual: self.observed.len(),
            });
        }
        match self
            .observed
            .iter()
            .find(|row| row.len() != self.col_labels.len())
        {
            Some(row) => Err(SurveyError::DimensionMismatch {
                expected: self.col_labels.len(),
                actual: row.len(),
            }),
            None => Ok(()),
        }
    }
}

/// Cross-tabulates `x` (rows) against `y` (columns) over complete rows.
pub fn crosstab(df: &DataFrame, x: &str, y: &str) -> Result<ContingencyTable> {
    let x_col = df.require_column(x)?;
    let y_col = df.require_column(y)?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    for i in 0..df.row_count() {
        if let (Some(a), Some(b)) = (x_col.label_at(i), y_col.label_at(i)) {
            pairs.push((a.into_owned(), b.into_owned()));
        }
    }
    log::debug!(
        "crosstab '{x}' x '{y}': {} complete rows of {}",
        pairs.len(),
        df.row_count()
    );
    if pairs.is_empty() {
        return Err(SurveyError::undefined(format!(
            "no rows with both '{x}' and '{y}' present"
        )));
    }

    let row_labels = sorted_labels(x_col, pairs.iter().map(|(a, _)| a.as_str()));
    let col_labels = sorted_labels(y_col, pairs.iter().map(|(_, b)| b.as_str()));
    let row_index: HashMap<&str, usize> = index_of(&row_labels);
    let col_index: HashMap<&str, usize> = index_of(&col_labels);

    let mut observed = vec![vec![0usize; col_labels.len()]; row_labels.len()];
    for (a, b) in &pairs {
        if let (Some(&i), Some(&j)) = (row_index.get(a.as_str()), col_index.get(b.as_str())) {
            observed[i][j] += 1;
        }
    }

    Ok(ContingencyTable {
        row_variable: x.to_string(),
        col_variable: y.to_string(),
        row_labels,
        col_labels,
        observed,
    })
}

fn sorted_labels<'a>(col: &Column, labels: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for label in labels {
        if seen.insert(label) {
            distinct.push(label.to_string());
        }
    }
    if col.role().is_numeric() {
        let value = |s: &str| s.parse::<f64>().unwrap_or(f64::NAN);
        distinct.sort_by(|a, b| value(a).total_cmp(&value(b)));
    } else {
        distinct.sort();
    }
    distinct
}

fn index_of(labels: &[String]) -> HashMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(i, l)| (l.as_str(), i))
        .collect()
}

// ── Chi-square test ───────────────────────────────────────────────────

/// Presentation-level reading of a chi-square p-value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationVerdict {
    Significant,
    NotSignificant,
}

impl fmt::Display for AssociationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Significant => write!(f, "significant association"),
            Self::NotSignificant => write!(f, "no significant association"),
        }
    }
}

/// Chi-square test of independence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChiSquareResult {
    pub table: ContingencyTable,
    /// Expected counts, same shape as the observed table.
    pub expected: Vec<Vec<f64>>,
    /// Pearson's chi-square, Yates-corrected when `yates_corrected` is set.
    pub statistic: f64,
    pub dof: usize,
    pub p_value: f64,
    /// Whether the continuity correction was applied (1 degree of freedom only).
    pub yates_corrected: bool,
    /// Cramér's V from the uncorrected statistic; `None` for a single row or column.
    pub cramers_v: Option<f64>,
}

impl ChiSquareResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    /// Verdict at `config.alpha`.
    pub fn verdict(&self, config: &AnalysisConfig) -> AssociationVerdict {
        if self.is_significant(config.alpha) {
            AssociationVerdict::Significant
        } else {
            AssociationVerdict::NotSignificant
        }
    }
}

/// Cross-tabulates `x` against `y` and tests for independence.
pub fn chi_square(
    df: &DataFrame,
    x: &str,
    y: &str,
    config: &AnalysisConfig,
) -> Result<ChiSquareResult> {
    chi_square_table(crosstab(df, x, y)?, config)
}

/// Tests an already-built table for independence.
///
/// A table whose `observed` counts do not match its labels is a
/// [`SurveyError::DimensionMismatch`]; an all-zero row or column makes the
/// test [`SurveyError::Undefined`].
pub fn chi_square_table(table: ContingencyTable, config: &AnalysisConfig) -> Result<ChiSquareResult> {
    table.check_shape()?;
    if table.row_labels.is_empty() || table.col_labels.is_empty() || table.grand_total() == 0 {
        return Err(SurveyError::undefined("contingency table is empty"));
    }

    let expected = table.expected();
    let dof = table.dof();
    if dof == 0 {
        return Ok(ChiSquareResult {
            table,
            expected,
            statistic: 0.0,
            dof,
            p_value: 1.0,
            yates_corrected: false,
            cramers_v: None,
        });
    }

    let (rows, cols) = (table.row_labels.len(), table.col_labels.len());
    let flat: Vec<f64> = table.observed.iter().flatten().map(|&c| c as f64).collect();
    let pearson = u_analytics::testing::chi_squared_independence(&flat, rows, cols)
        .ok_or_else(|| {
            SurveyError::undefined("chi-square is undefined when a row or column total is zero")
        })?;

    let n = table.grand_total() as f64;
    let k = rows.min(cols);
    let cramers_v = Some((pearson.statistic / (n * (k - 1) as f64)).sqrt().min(1.0));

    let yates_corrected = config.yates_correction && dof == 1;
    let (chi2, p_value) = if yates_corrected {
        let chi2 = yates_statistic(&table.observed, &expected);
        let dist = ChiSquared::new(dof as f64)
            .map_err(|e| SurveyError::undefined(format!("chi-squared distribution: {e}")))?;
        (chi2, dist.sf(chi2))
    } else {
        (pearson.statistic, pearson.p_value)
    };
    let p_value = p_value.clamp(0.0, 1.0);

    log::debug!("chi-square {rows} x {cols}: statistic {chi2:.4}, dof {dof}, p {p_value:.4}");

    Ok(ChiSquareResult {
        table,
        expected,
        statistic: chi2,
        dof,
        p_value,
        yates_corrected,
        cramers_v,
    })
}

/// Σ (|O − E| − 0.5)² / E, with the correction never overshooting E.
fn yates_statistic(observed: &[Vec<usize>], expected: &[Vec<f64>]) -> f64 {
    observed
        .iter()
        .flatten()
        .zip(expected.iter().flatten())
        .map(|(&o, &e)| {
            let diff = ((o as f64 - e).abs() - 0.5).max(0.0);
            diff * diff / e
        })
        .sum()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(x: &[Option<&str>], y: &[Option<&str>]) -> DataFrame {
        let mut df = DataFrame::new();
        df.add_column("x".into(), Column::from_categories(x)).unwrap();
        df.add_column("y".into(), Column::from_categories(y)).unwrap();
        df
    }

    fn table(observed: Vec<Vec<usize>>) -> ContingencyTable {
        ContingencyTable {
            row_variable: "r".into(),
            col_variable: "c".into(),
            row_labels: (0..observed.len()).map(|i| format!("r{i}")).collect(),
            col_labels: (0..observed[0].len()).map(|j| format!("c{j}")).collect(),
            observed,
        }
    }

    // ── Crosstab ──

    #[test]
    fn drops_incomplete_rows() {
        let df = frame(
            &[Some("b"), Some("a"), None, Some("a"), Some("b")],
            &[Some("no"), Some("yes"), Some("yes"), None, Some("yes")],
        );
        let t = crosstab(&df, "x", "y").unwrap();
        assert_eq!(t.row_labels, vec!["a", "b"]);
        assert_eq!(t.col_labels, vec!["no", "yes"]);
        assert_eq!(t.observed, vec![vec![0, 1], vec![1, 1]]);
        assert_eq!(t.grand_total(), 3);
    }

    #[test]
    fn numeric_labels_sorted_by_value() {
        let mut df = DataFrame::new();
        df.add_column(
            "n".into(),
            Column::from_numbers(&[Some(10.0), Some(2.0), Some(1.5), Some(2.0)]),
        )
        .unwrap();
        df.add_column(
            "c".into(),
            Column::from_categories(&[Some("a"), Some("b"), Some("a"), Some("b")]),
        )
        .unwrap();
        let t = crosstab(&df, "n", "c").unwrap();
        assert_eq!(t.row_labels, vec!["1.5", "2", "10"]);
    }

    #[test]
    fn empty_crosstab_is_undefined() {
        let df = frame(&[Some("a"), None], &[None, Some("b")]);
        assert!(matches!(
            crosstab(&df, "x", "y"),
            Err(SurveyError::Undefined { .. })
        ));
    }

    // ── Chi-square ──

    #[test]
    fn perfect_association_with_yates() {
        let result = chi_square_table(table(vec![vec![10, 0], vec![0, 10]]), &AnalysisConfig::default())
            .unwrap();
        assert!(result.yates_corrected);
        assert!((result.statistic - 16.2).abs() < 1e-9);
        assert!(result.p_value < 1e-4);
        assert!(result.is_significant(0.05));
        assert!((result.cramers_v.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn yates_can_be_disabled() {
        let config = AnalysisConfig {
            yates_correction: false,
            ..AnalysisConfig::default()
        };
        let result = chi_square_table(table(vec![vec![10, 0], vec![0, 10]]), &config).unwrap();
        assert!(!result.yates_corrected);
        assert!((result.statistic - 20.0).abs() < 1e-9);
    }

    #[test]
    fn larger_table_uncorrected() {
        let result = chi_square_table(
            table(vec![vec![10, 20, 30], vec![15, 25, 5]]),
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(result.dof, 2);
        assert!(!result.yates_corrected);
        assert!(result.statistic >= 0.0);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn independence_not_significant() {
        let config = AnalysisConfig::default();
        let result = chi_square_table(table(vec![vec![25, 25], vec![25, 25]]), &config).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.verdict(&config), AssociationVerdict::NotSignificant);
    }

    #[test]
    fn single_row_has_zero_dof() {
        let result = chi_square_table(table(vec![vec![3, 4, 5]]), &AnalysisConfig::default()).unwrap();
        assert_eq!(result.dof, 0);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
        assert_eq!(result.cramers_v, None);
    }

    #[test]
    fn expected_margins_match_observed() {
        let t = table(vec![vec![3, 7, 1], vec![6, 2, 9], vec![4, 4, 4]]);
        let expected = t.expected();
        for (i, total) in t.row_totals().iter().enumerate() {
            let sum: f64 = expected[i].iter().sum();
            assert!((sum - *total as f64).abs() < 1e-9);
        }
        for (j, total) in t.col_totals().iter().enumerate() {
            let sum: f64 = expected.iter().map(|row| row[j]).sum();
            assert!((sum - *total as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn ragged_table_rejected() {
        let mut t = table(vec![vec![1, 2], vec![3, 4]]);
        t.observed[1].pop();
        assert_eq!(
            chi_square_table(t, &AnalysisConfig::default()).unwrap_err(),
            SurveyError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn labels_must_match_rows() {
        let mut t = table(vec![vec![1, 2], vec![3, 4]]);
        t.row_labels.push("extra".into());
        assert!(matches!(
            chi_square_table(t, &AnalysisConfig::default()),
            Err(SurveyError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn zero_column_total_is_undefined() {
        let t = table(vec![vec![4, 0, 2], vec![1, 0, 5]]);
        assert!(matches!(
            chi_square_table(t, &AnalysisConfig::default()),
            Err(SurveyError::Undefined { .. })
        ));
    }

    #[test]
    fn repeated_calls_agree() {
        let df = frame(
            &[Some("a"), Some("a"), Some("b"), Some("b"), Some("a"), Some("c")],
            &[Some("x"), Some("y"), Some("y"), Some("y"), Some("x"), Some("x")],
        );
        let config = AnalysisConfig::default();
        let first = chi_square(&df, "x", "y", &config).unwrap();
        let second = chi_square(&df, "x", "y", &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn from_frame() {
        let df = frame(
            &[Some("a"), Some("a"), Some("b"), Some("b")],
            &[Some("x"), Some("x"), Some("y"), Some("y")],
        );
        let result = chi_square(&df, "x", "y", &AnalysisConfig::default()).unwrap();
        assert_eq!(result.table.grand_total(), 4);
        assert_eq!(result.dof, 1);
    }
}
