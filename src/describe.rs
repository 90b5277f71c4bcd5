//! Descriptive statistics and normality testing for one numeric column.
//!
//! Values are coerced to numbers (unparseable strings count as missing) and
//! missing values are dropped before anything is computed. A column with no
//! usable values yields [`SurveyError::NoData`] instead of NaN statistics.
//!
//! # Example
//!
//! ```
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::describe::describe;
//!
//! let df = CsvParser::new().parse_str("score\n1\n2\n3\n4\n5\n").unwrap();
//! let summary = describe(&df, "score").unwrap();
//! assert_eq!(summary.mean, 3.0);
//! assert_eq!(summary.median, 3.0);
//! assert!((summary.std_dev.unwrap() - 2.5f64.sqrt()).abs() < 1e-12);
//! ```

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::config::AnalysisConfig;
use crate::dataframe::DataFrame;
use crate::error::{Result, SurveyError};

// ── Descriptive summary ───────────────────────────────────────────────

/// Summary statistics over the non-missing values of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveSummary {
    /// Column name.
    pub column: String,
    /// Number of non-missing values used.
    pub count: usize,
    /// Number of rows that were missing or not numeric.
    pub missing: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Median (linear interpolation between the middle values for even counts).
    pub median: f64,
    /// Most frequent value; the smallest one when several tie.
    pub mode: f64,
    /// Every value sharing the highest frequency, ascending.
    pub modes: Vec<f64>,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n − 1). `None` for a single observation.
    pub std_dev: Option<f64>,
    /// 25th percentile.
    pub q1: f64,
    /// 75th percentile.
    pub q3: f64,
}

/// Computes the descriptive summary of `column`.
pub fn describe(df: &DataFrame, column: &str) -> Result<DescriptiveSummary> {
    let col = df.require_column(column)?;
    let values = col.valid_numeric_values();
    let missing = col.len() - values.len();
    log::debug!(
        "describe '{column}': {} usable values, {missing} dropped",
        values.len()
    );
    summarize(column, &values, missing)
}

/// Computes the summary of already-extracted values.
pub fn summarize(column: &str, values: &[f64], missing: usize) -> Result<DescriptiveSummary> {
    let no_data = || SurveyError::NoData {
        column: column.to_string(),
    };
    if values.is_empty() {
        return Err(no_data());
    }

    let mean = u_numflow::stats::mean(values).ok_or_else(no_data)?;
    let median = u_numflow::stats::median(values).ok_or_else(no_data)?;
    let min = u_numflow::stats::min(values).ok_or_else(no_data)?;
    let max = u_numflow::stats::max(values).ok_or_else(no_data)?;
    let std_dev = if values.len() > 1 {
        u_numflow::stats::std_dev(values)
    } else {
        None
    };
    let q1 = u_numflow::stats::quantile(values, 0.25).unwrap_or(median);
    let q3 = u_numflow::stats::quantile(values, 0.75).unwrap_or(median);

    let modes = modal_values(values);
    let mode = modes[0];

    Ok(DescriptiveSummary {
        column: column.to_string(),
        count: values.len(),
        missing,
        mean,
        median,
        mode,
        modes,
        min,
        max,
        std_dev,
        q1,
        q3,
    })
}

/// Returns all values with the highest frequency, ascending. `values` must
/// be non-empty.
fn modal_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut best = 0usize;
    let mut modes = Vec::new();
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end] == sorted[start] {
            end += 1;
        }
        let run = end - start;
        if run > best {
            best = run;
            modes.clear();
        }
        if run == best {
            modes.push(sorted[start]);
        }
        start = end;
    }
    modes
}

// ── Normality test ────────────────────────────────────────────────────

/// Outcome of a normality test at a fixed significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NormalityVerdict {
    /// p < α: reject normality.
    DeviatesFromNormal,
    /// p ≥ α: no significant deviation.
    ConsistentWithNormal,
}

/// D'Agostino-Pearson omnibus normality test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalityResult {
    /// Sample size.
    pub n: usize,
    /// Skewness z-score.
    pub z_skewness: f64,
    /// Kurtosis z-score.
    pub z_kurtosis: f64,
    /// K² = z_skewness² + z_kurtosis².
    pub statistic: f64,
    /// P-value from χ² with 2 degrees of freedom.
    pub p_value: f64,
    /// Verdict at the configured α.
    pub verdict: NormalityVerdict,
}

/// Runs the normality test on the non-missing values of `column`.
pub fn column_normality(df: &DataFrame, column: &str, config: &AnalysisConfig) -> Result<NormalityResult> {
    let values = df.require_column(column)?.valid_numeric_values();
    if values.is_empty() {
        return Err(SurveyError::NoData {
            column: column.to_string(),
        });
    }
    normality_test(&values, config)
}

/// D'Agostino-Pearson K² test combining the skewness and kurtosis tests.
///
/// Requires at least `config.normality_min_samples` (default 8) values;
/// fewer yields `InsufficientData`. Constant data yields `Undefined`.
///
/// ```
/// use survey_insight::config::AnalysisConfig;
/// use survey_insight::describe::{normality_test, NormalityVerdict};
///
/// let skewed = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 50.0];
/// let result = normality_test(&skewed, &AnalysisConfig::default()).unwrap();
/// assert_eq!(result.verdict, NormalityVerdict::DeviatesFromNormal);
/// ```
pub fn normality_test(values: &[f64], config: &AnalysisConfig) -> Result<NormalityResult> {
    let n = values.len();
    let min_required = config.normality_min_samples.max(8);
    if n < min_required {
        return Err(SurveyError::InsufficientData {
            min_required,
            actual: n,
        });
    }

    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= nf;
    m3 /= nf;
    m4 /= nf;
    if m2 <= 0.0 || !m2.is_finite() {
        return Err(SurveyError::undefined("normality test on constant data"));
    }

    let skewness = m3 / m2.powf(1.5);
    let kurtosis = m4 / (m2 * m2);
    let z_skewness = skew_z(skewness, nf);
    let z_kurtosis = kurtosis_z(kurtosis, nf);
    if !z_skewness.is_finite() || !z_kurtosis.is_finite() {
        return Err(SurveyError::undefined("normality statistic is not finite"));
    }

    let statistic = z_skewness * z_skewness + z_kurtosis * z_kurtosis;
    let p_value = ChiSquared::new(2.0)
        .map(|dist| dist.sf(statistic))
        .unwrap_or_else(|_| (-statistic / 2.0).exp());
    let verdict = if p_value < config.alpha {
        NormalityVerdict::DeviatesFromNormal
    } else {
        NormalityVerdict::ConsistentWithNormal
    };

    Ok(NormalityResult {
        n,
        z_skewness,
        z_kurtosis,
        statistic,
        p_value,
        verdict,
    })
}

/// D'Agostino (1970) transformation of sample skewness to a z-score.
fn skew_z(b1: f64, n: f64) -> f64 {
    let mut y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    if y == 0.0 {
        y = 1.0;
    }
    let ya = y / alpha;
    delta * (ya + (ya * ya + 1.0).sqrt()).ln()
}

/// Anscombe-Glynn (1983) transformation of sample kurtosis to a z-score.
fn kurtosis_z(b2: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let var_b2 = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / var_b2.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

// ── Tests ─────────────────────────────────────────────────────────────
