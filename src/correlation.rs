//! Pearson and Spearman correlation between two columns.
//!
//! Both columns are coerced to numbers and only rows where both values are
//! present are used (pairwise complete cases). The p-value is two-sided,
//! from Student's t with n − 2 degrees of freedom.
//!
//! # Example
//!
//! ```
//! use survey_insight::config::AnalysisConfig;
//! use survey_insight::correlation::{correlate, CorrelationMethod, Direction, Strength};
//! use survey_insight::csv_parser::CsvParser;
//!
//! let df = CsvParser::new()
//!     .parse_str("hours,score\n1,2\n2,1\n3,4\n4,3\n5,5\n")
//!     .unwrap();
//! let result = correlate(&df, "hours", "score", CorrelationMethod::Pearson, &AnalysisConfig::default()).unwrap();
//! assert!((result.r - 0.8).abs() < 1e-12);
//! assert!((result.p_value - 0.1041).abs() < 1e-3);
//! assert_eq!(result.interpretation.strength, Strength::Strong);
//! assert_eq!(result.interpretation.direction, Direction::Positive);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::dataframe::DataFrame;
use crate::error::{Result, SurveyError};

// ── Method ────────────────────────────────────────────────────────────

/// Correlation coefficient to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation.
    Pearson,
    /// Spearman rank correlation (average ranks for ties).
    Spearman,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pearson => write!(f, "pearson"),
            Self::Spearman => write!(f, "spearman"),
        }
    }
}

impl FromStr for CorrelationMethod {
    type Err = SurveyError;

    /// Case-insensitive.
    ///
    /// ```
    /// use survey_insight::correlation::CorrelationMethod;
    ///
    /// assert_eq!("Spearman".parse::<CorrelationMethod>().unwrap(), CorrelationMethod::Spearman);
    /// assert!("kendall".parse::<CorrelationMethod>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pearson" => Ok(Self::Pearson),
            "spearman" => Ok(Self::Spearman),
            _ => Err(SurveyError::InvalidSelection {
                column: s.to_string(),
                reason: "unknown correlation method, expected pearson or spearman".to_string(),
            }),
        }
    }
}

// ── Interpretation ────────────────────────────────────────────────────

/// Strength of a relationship by |r|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    None,
    Weak,
    Moderate,
    Strong,
}

/// Sign of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    NearZero,
}

/// Qualitative reading of a coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interpretation {
    pub strength: Strength,
    pub direction: Direction,
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strength = match self.strength {
            Strength::None => return write!(f, "no correlation"),
            Strength::Weak => "weak",
            Strength::Moderate => "moderate",
            Strength::Strong => "strong",
        };
        match self.direction {
            Direction::Positive => write!(f, "{strength} positive correlation"),
            Direction::Negative => write!(f, "{strength} negative correlation"),
            Direction::NearZero => write!(f, "{strength} correlation, no clear direction"),
        }
    }
}

/// Classifies `r` with the thresholds in `config`.
///
/// ```
/// use survey_insight::config::AnalysisConfig;
/// use survey_insight::correlation::interpret;
///
/// let config = AnalysisConfig::default();
/// assert_eq!(interpret(-0.42, &config).to_string(), "moderate negative correlation");
/// assert_eq!(interpret(0.03, &config).to_string(), "no correlation");
/// ```
pub fn interpret(r: f64, config: &AnalysisConfig) -> Interpretation {
    let t = &config.strength_thresholds;
    let magnitude = r.abs();
    let strength = if magnitude < t.weak {
        Strength::None
    } else if magnitude < t.moderate {
        Strength::Weak
    } else if magnitude < t.strong {
        Strength::Moderate
    } else {
        Strength::Strong
    };
    let direction = if r > config.direction_threshold {
        Direction::Positive
    } else if r < -config.direction_threshold {
        Direction::Negative
    } else {
        Direction::NearZero
    };
    Interpretation {
        strength,
        direction,
    }
}

// ── Pairwise correlation ──────────────────────────────────────────────

/// Correlation between two columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub x: String,
    pub y: String,
    pub method: CorrelationMethod,
    /// Coefficient in [-1, 1].
    pub r: f64,
    /// Two-sided p-value in [0, 1].
    pub p_value: f64,
    /// Complete-case pairs used.
    pub n: usize,
    pub interpretation: Interpretation,
}

/// Correlates columns `x` and `y`.
///
/// Fewer than two complete pairs yield [`SurveyError::InsufficientData`];
/// a constant variable yields [`SurveyError::Undefined`].
pub fn correlate(
    df: &DataFrame,
    x: &str,
    y: &str,
    method: CorrelationMethod,
    config: &AnalysisConfig,
) -> Result<CorrelationResult> {
    let (xs, ys) = complete_pairs(df, x, y)?;
    let (r, p_value) = coefficient(&xs, &ys, method)?;
    Ok(CorrelationResult {
        x: x.to_string(),
        y: y.to_string(),
        method,
        r,
        p_value,
        n: xs.len(),
        interpretation: interpret(r, config),
    })
}

/// Coefficient and two-sided p-value for paired samples.
///
/// Two pairs give r = ±1 with p = 1 (no degrees of freedom left).
pub fn coefficient(xs: &[f64], ys: &[f64], method: CorrelationMethod) -> Result<(f64, f64)> {
    if xs.len() != ys.len() {
        return Err(SurveyError::DimensionMismatch {
            expected: xs.len(),
            actual: ys.len(),
        });
    }
    if xs.len() < 2 {
        return Err(SurveyError::InsufficientData {
            min_required: 2,
            actual: xs.len(),
        });
    }
    let constant = || SurveyError::undefined("correlation is undefined when a variable is constant");
    if xs.len() == 2 {
        let slope = (xs[1] - xs[0]) * (ys[1] - ys[0]);
        if slope == 0.0 {
            return Err(constant());
        }
        return Ok((slope.signum(), 1.0));
    }

    let result = match method {
        CorrelationMethod::Pearson => u_analytics::correlation::pearson(xs, ys),
        CorrelationMethod::Spearman => u_analytics::correlation::spearman(xs, ys),
    }
    .ok_or_else(constant)?;
    Ok((result.r, result.p_value.clamp(0.0, 1.0)))
}

/// Rows where both columns have a numeric value.
fn complete_pairs(df: &DataFrame, x: &str, y: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let xs = df.require_column(x)?.coerce_numeric();
    let ys = df.require_column(y)?.coerce_numeric();
    let (a, b): (Vec<f64>, Vec<f64>) = xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
        .unzip();
    log::debug!(
        "correlate '{x}' ~ '{y}': {} complete pairs of {} rows",
        a.len(),
        df.row_count()
    );
    Ok((a, b))
}

// ── Correlation matrix ────────────────────────────────────────────────

/// One off-diagonal entry of a matrix, for ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationPair {
    pub x: String,
    pub y: String,
    pub r: f64,
    pub p_value: f64,
    pub n: usize,
    pub interpretation: Interpretation,
}

/// Correlations between every pair of the selected columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub columns: Vec<String>,
    /// `cells[i][j]`; `None` where the pair is undefined.
    pub cells: Vec<Vec<Option<CorrelationResult>>>,
}

impl CorrelationMatrix {
    /// Coefficient between columns `i` and `j`, if defined.
    pub fn r(&self, i: usize, j: usize) -> Option<f64> {
        self.cells
            .get(i)
            .and_then(|row| row.get(j))
            .and_then(|cell| cell.as_ref())
            .map(|c| c.r)
    }

    /// The `k` defined off-diagonal pairs with the largest |r|.
    pub fn top_pairs(&self, k: usize) -> Vec<CorrelationPair> {
        let mut pairs: Vec<CorrelationPair> = Vec::new();
        for (i, row) in self.cells.iter().enumerate() {
            for cell in row.iter().skip(i + 1).flatten() {
                pairs.push(CorrelationPair {
                    x: cell.x.clone(),
                    y: cell.y.clone(),
                    r: cell.r,
                    p_value: cell.p_value,
                    n: cell.n,
                    interpretation: cell.interpretation,
                });
            }
        }
        pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
        pairs.truncate(k);
        pairs
    }
}

/// Correlates every pair of `columns`, each pair on its own complete cases.
///
/// ```
/// use survey_insight::config::AnalysisConfig;
/// use survey_insight::correlation::{correlation_matrix, CorrelationMethod};
/// use survey_insight::csv_parser::CsvParser;
///
/// let df = CsvParser::new()
///     .parse_str("a,b,c\n1,2,9\n2,4,7\n3,6,8\n4,8,1\n")
///     .unwrap();
/// let m = correlation_matrix(&df, &["a", "b", "c"], CorrelationMethod::Pearson, &AnalysisConfig::default()).unwrap();
/// let top = m.top_pairs(1);
/// assert_eq!((top[0].x.as_str(), top[0].y.as_str()), ("a", "b"));
/// ```
pub fn correlation_matrix<S: AsRef<str>>(
    df: &DataFrame,
    columns: &[S],
    method: CorrelationMethod,
    config: &AnalysisConfig,
) -> Result<CorrelationMatrix> {
    if columns.len() < 2 {
        return Err(SurveyError::InsufficientData {
            min_required: 2,
            actual: columns.len(),
        });
    }
    for name in columns {
        df.require_column(name.as_ref())?;
    }

    let k = columns.len();
    let mut cells: Vec<Vec<Option<CorrelationResult>>> = vec![vec![None; k]; k];
    for i in 0..k {
        for j in i..k {
            let (x, y) = (columns[i].as_ref(), columns[j].as_ref());
            match correlate(df, x, y, method, config) {
                Ok(result) => {
                    if i != j {
                        cells[j][i] = Some(CorrelationResult {
                            x: y.to_string(),
                            y: x.to_string(),
                            ..result.clone()
                        });
                    }
                    cells[i][j] = Some(result);
                }
                Err(e) if e.is_recoverable() => {
                    log::warn!("correlation '{x}' ~ '{y}' skipped: {e}");
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(CorrelationMatrix {
        method,
        columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        cells,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::Column;

    fn frame(cols: &[(&str, Vec<Option<f64>>)]) -> DataFrame {
        let mut df = DataFrame::new();
        for (name, values) in cols {
            df.add_column((*name).into(), Column::from_numbers(values))
                .unwrap();
        }
        df
    }

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    // ── Pearson ──

    #[test]
    fn perfect_positive() {
        let x = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = some(&[2.0, 4.0, 6.0, 8.0, 10.0]);
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        let res = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config()).unwrap();
        assert!((res.r - 1.0).abs() < 1e-12);
        assert!(res.p_value < 1e-6);
        assert_eq!(res.n, 5);
        assert_eq!(res.interpretation.strength, Strength::Strong);
    }

    #[test]
    fn known_value() {
        let x = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = some(&[2.0, 1.0, 4.0, 3.0, 5.0]);
        let (r, p) = coefficient(
            &x.iter().flatten().copied().collect::<Vec<_>>(),
            &y.iter().flatten().copied().collect::<Vec<_>>(),
            CorrelationMethod::Pearson,
        )
        .unwrap();
        assert!((r - 0.8).abs() < 1e-12);
        assert!((p - 0.1041).abs() < 1e-3);
    }

    #[test]
    fn symmetric() {
        let x = some(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
        let y = some(&[2.0, 7.0, 1.0, 8.0, 2.0, 8.0]);
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        for method in [CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
            let a = correlate(&df, "x", "y", method, &config()).unwrap();
            let b = correlate(&df, "y", "x", method, &config()).unwrap();
            assert_eq!(a.r, b.r);
            assert!((-1.0..=1.0).contains(&a.r));
            assert!((0.0..=1.0).contains(&a.p_value));
        }
    }

    #[test]
    fn missing_rows_dropped_pairwise() {
        let x = vec![Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)];
        let y = vec![Some(1.0), Some(9.0), None, Some(4.0), Some(5.0)];
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        let res = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config()).unwrap();
        assert_eq!(res.n, 3);
        assert!((res.r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn two_pairs_is_minimum() {
        let x = some(&[1.0, 2.0]);
        let df = frame(&[("x", x.clone()), ("y", x.clone())]);
        let res = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config()).unwrap();
        assert!((res.r - 1.0).abs() < 1e-12);
        assert_eq!(res.p_value, 1.0);
    }

    #[test]
    fn one_pair_insufficient() {
        let x = vec![Some(1.0), None, Some(2.0)];
        let y = vec![Some(1.0), Some(2.0), None];
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        let err = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config()).unwrap_err();
        assert_eq!(
            err,
            SurveyError::InsufficientData {
                min_required: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn constant_is_undefined() {
        let x = some(&[1.0, 2.0, 3.0]);
        let y = some(&[4.0, 4.0, 4.0]);
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        let err = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config()).unwrap_err();
        assert!(matches!(err, SurveyError::Undefined { .. }));
    }

    #[test]
    fn text_column_coerced() {
        let mut df = frame(&[("x", some(&[1.0, 2.0, 3.0, 4.0]))]);
        df.add_column(
            "y".into(),
            Column::from_texts(&[Some("2"), Some("n/a"), Some("6"), Some("8")]),
        )
        .unwrap();
        let res = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config()).unwrap();
        assert_eq!(res.n, 3);
    }

    // ── Spearman ──

    #[test]
    fn spearman_monotone_is_one() {
        let x = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = some(&[1.0, 4.0, 9.0, 16.0, 100.0]);
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        let res = correlate(&df, "x", "y", CorrelationMethod::Spearman, &config()).unwrap();
        assert!((res.r - 1.0).abs() < 1e-12);
        assert_eq!(res.p_value, 0.0);
    }

    #[test]
    fn spearman_with_ties() {
        // mid-ranks: x -> [1, 2.5, 2.5, 4, 5], y -> [1, 4, 2.5, 2.5, 5]
        let x = some(&[1.0, 2.0, 2.0, 3.0, 4.0]);
        let y = some(&[1.0, 3.0, 2.0, 2.0, 5.0]);
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        let res = correlate(&df, "x", "y", CorrelationMethod::Spearman, &config()).unwrap();
        assert!((res.r - 7.25 / 9.5).abs() < 1e-12);
        assert!((res.p_value - 0.13334).abs() < 1e-4);
        assert_eq!(res.n, 5);
    }

    #[test]
    fn two_pairs_negative() {
        let df = frame(&[("x", some(&[1.0, 2.0])), ("y", some(&[5.0, 3.0]))]);
        let res = correlate(&df, "x", "y", CorrelationMethod::Spearman, &config()).unwrap();
        assert_eq!(res.r, -1.0);
        assert_eq!(res.p_value, 1.0);
    }

    #[test]
    fn repeated_calls_agree() {
        let x = some(&[3.0, 1.0, 4.0, 1.0, 5.0, 9.0]);
        let y = some(&[2.0, 7.0, 1.0, 8.0, 2.0, 8.0]);
        let df = frame(&[("x", x.clone()), ("y", y.clone())]);
        for method in [CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
            let first = correlate(&df, "x", "y", method, &config()).unwrap();
            let second = correlate(&df, "x", "y", method, &config()).unwrap();
            assert_eq!(first, second);
        }
    }

    // ── Interpretation ──

    #[test]
    fn interpretation_bands() {
        let c = config();
        assert_eq!(interpret(0.05, &c).strength, Strength::None);
        assert_eq!(interpret(0.05, &c).direction, Direction::NearZero);
        assert_eq!(interpret(0.1, &c).strength, Strength::Weak);
        assert_eq!(interpret(-0.3, &c).strength, Strength::Moderate);
        assert_eq!(interpret(-0.3, &c).direction, Direction::Negative);
        assert_eq!(interpret(0.5, &c).strength, Strength::Strong);
        assert_eq!(interpret(0.06, &c).direction, Direction::Positive);
    }

    #[test]
    fn method_parsing() {
        assert_eq!(
            "PEARSON".parse::<CorrelationMethod>().unwrap(),
            CorrelationMethod::Pearson
        );
        assert!(matches!(
            "tau".parse::<CorrelationMethod>(),
            Err(SurveyError::InvalidSelection { .. })
        ));
    }

    // ── Matrix ──

    #[test]
    fn matrix_marks_undefined_pairs() {
        let a = some(&[1.0, 2.0, 3.0, 4.0]);
        let b = some(&[4.0, 3.0, 2.0, 1.0]);
        let c = some(&[7.0, 7.0, 7.0, 7.0]);
        let df = frame(&[("a", a.clone()), ("b", b.clone()), ("c", c.clone())]);
        let m = correlation_matrix(&df, &["a", "b", "c"], CorrelationMethod::Pearson, &config())
            .unwrap();
        assert!((m.r(0, 1).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(m.r(0, 1), m.r(1, 0));
        assert_eq!(m.r(0, 2), None);
        assert_eq!(m.r(2, 2), None);
        let top = m.top_pairs(5);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].interpretation.direction, Direction::Negative);
    }

    #[test]
    fn matrix_needs_two_columns() {
        let a = some(&[1.0, 2.0]);
        let df = frame(&[("a", a.clone())]);
        assert!(matches!(
            correlation_matrix(&df, &["a"], CorrelationMethod::Pearson, &config()),
            Err(SurveyError::InsufficientData { .. })
        ));
    }

    #[test]
    fn matrix_unknown_column() {
        let a = some(&[1.0, 2.0]);
        let df = frame(&[("a", a.clone())]);
        assert!(matches!(
            correlation_matrix(&df, &["a", "zz"], CorrelationMethod::Pearson, &config()),
            Err(SurveyError::InvalidSelection { .. })
        ));
    }
}
