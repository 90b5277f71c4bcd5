//! Analysis configuration.
//!
//! Every threshold the engine applies lives in [`AnalysisConfig`] and is
//! passed explicitly to the operations that need it. Defaults reproduce the
//! survey dashboard's fixed policies (α = 0.05, normality test from 8
//! observations, correlation strength cut-offs 0.1 / 0.3 / 0.5).
//!
//! ```
//! use survey_insight::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_toml_str(r#"
//!     alpha = 0.01
//!     top_n_tokens = 15
//!     extra_stopwords = ["app"]
//! "#).unwrap();
//! assert_eq!(config.alpha, 0.01);
//! assert_eq!(config.normality_min_samples, 8); // default kept
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};

/// |r| cut-offs separating none / weak / moderate / strong correlation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthThresholds {
    /// Below this |r| the relationship is "none". Default: 0.1.
    pub weak: f64,
    /// Below this |r| the relationship is "weak". Default: 0.3.
    pub moderate: f64,
    /// Below this |r| the relationship is "moderate", otherwise "strong". Default: 0.5.
    pub strong: f64,
}

impl Default for StrengthThresholds {
    fn default() -> Self {
        Self {
            weak: 0.1,
            moderate: 0.3,
            strong: 0.5,
        }
    }
}

/// Configuration shared by all analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance level for normality and chi-square verdicts. Default: 0.05.
    pub alpha: f64,
    /// Minimum sample size for the normality test. Default: 8.
    pub normality_min_samples: usize,
    /// Correlation strength cut-offs.
    pub strength_thresholds: StrengthThresholds,
    /// r above this is positive, below its negation negative. Default: 0.05.
    pub direction_threshold: f64,
    /// Tokens returned by word-frequency analysis, including report text
    /// sections. Default: 10.
    pub top_n_tokens: usize,
    /// Apply Yates' continuity correction to 2x2 tables. Default: true.
    pub yates_correction: bool,
    /// Stopwords removed in addition to the English list.
    pub extra_stopwords: Vec<String>,
    /// Report limits.
    pub report: ReportLimits,
}

/// How much of each section the assembled report includes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLimits {
    /// Numeric columns summarised. Default: 3.
    pub numeric_columns: usize,
    /// Categories listed per frequency table. Default: 15.
    pub categories_per_table: usize,
    /// Consecutive categorical pairs cross-tabulated. Default: 3.
    pub crosstab_pairs: usize,
    /// Strongest correlation pairs listed. Default: 5.
    pub correlation_pairs: usize,
    /// Text columns analysed. Default: 2.
    pub text_columns: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            numeric_columns: 3,
            categories_per_table: 15,
            crosstab_pairs: 3,
            correlation_pairs: 5,
            text_columns: 2,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            normality_min_samples: 8,
            strength_thresholds: StrengthThresholds::default(),
            direction_threshold: 0.05,
            top_n_tokens: 10,
            yates_correction: true,
            extra_stopwords: Vec::new(),
            report: ReportLimits::default(),
        }
    }
}

impl AnalysisConfig {
    /// Parses a TOML document; missing keys take their defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SurveyError::Config(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        // The test statistic needs n >= 8 to be defined.
        if self.normality_min_samples < 8 {
            return Err(SurveyError::Config(format!(
                "normality_min_samples must be at least 8, got {}",
                self.normality_min_samples
            )));
        }
        let t = &self.strength_thresholds;
        if !(0.0 <= t.weak && t.weak <= t.moderate && t.moderate <= t.strong && t.strong <= 1.0) {
            return Err(SurveyError::Config(format!(
                "strength thresholds must ascend within [0, 1], got {} / {} / {}",
                t.weak, t.moderate, t.strong
            )));
        }
        if !(0.0..1.0).contains(&self.direction_threshold) {
            return Err(SurveyError::Config(format!(
                "direction_threshold must be in [0, 1), got {}",
                self.direction_threshold
            )));
        }
        if self.top_n_tokens == 0 {
            return Err(SurveyError::Config("top_n_tokens must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alpha, 0.05);
        assert_eq!(config.direction_threshold, 0.05);
        assert!(config.yates_correction);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AnalysisConfig::from_toml_str(
            "yates_correction = false\n[report]\ntext_columns = 1\n",
        )
        .unwrap();
        assert!(!config.yates_correction);
        assert_eq!(config.report.text_columns, 1);
        assert_eq!(config.top_n_tokens, 10);
    }

    #[test]
    fn out_of_range_alpha_rejected() {
        let err = AnalysisConfig::from_toml_str("alpha = 1.5").unwrap_err();
        assert!(matches!(err, SurveyError::Config(_)));
    }

    #[test]
    fn descending_thresholds_rejected() {
        let err = AnalysisConfig::from_toml_str(
            "[strength_thresholds]\nweak = 0.5\nmoderate = 0.3\nstrong = 0.1\n",
        )
        .unwrap_err();
        assert!(matches!(err, SurveyError::Config(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = AnalysisConfig::from_toml_str("alpha = \"high\"").unwrap_err();
        assert!(matches!(err, SurveyError::Config(_)));
    }
}
