//! # survey-insight
//!
//! Statistical analysis engine for survey datasets.
//!
//! survey-insight takes a loaded table of responses plus column selections
//! and produces descriptive summaries, frequency tables, normality tests,
//! correlations with a qualitative reading, chi-square tests of
//! independence and word-frequency counts. Every operation is a pure
//! function over a read-only [`DataFrame`](dataframe::DataFrame); expected
//! edge cases (no data, too few rows, constant input, unknown column) come
//! back as [`SurveyError`](error::SurveyError) values instead of NaN.
//!
//! ## Modules
//!
//! - [`dataframe`] — Column-major tabular data model (DataFrame, Column, ValidityBitmap)
//! - [`classify`] — Numeric / categorical / text column roles
//! - [`csv_parser`] — CSV parsing with automatic role inference
//! - `excel` — Excel/ODS reading (feature `excel`)
//! - [`describe`] — Mean, median, mode, spread, quartiles; D'Agostino-Pearson normality test
//! - [`frequency`] — Count/percent tables with an explicit missing bucket
//! - [`text`] — Tokenizer, stopwords, word frequencies, answer lengths
//! - [`correlation`] — Pearson/Spearman with p-values, interpretation, correlation matrix
//! - [`contingency`] — Cross-tabulation, chi-square (Yates for 2x2), Cramér's V
//! - [`likert`] — Likert answer scoring, composite scores, quantile bins
//! - [`charts`] — Histogram, box plot, bar, stacked bar and scatter data; renderer trait
//! - [`report`] — Full survey report with highlights, serializable to JSON
//! - [`config`] — Thresholds and report limits, loadable from TOML
//! - [`error`] — Error types
//!
//! ## Quick Start
//!
//! ```
//! use survey_insight::classify::ColumnRole;
//! use survey_insight::config::AnalysisConfig;
//! use survey_insight::correlation::{correlate, CorrelationMethod};
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::frequency::frequency_table;
//!
//! let csv = "gender,hours,score\nF,1,2\nM,2,4\nF,3,6\nM,4,8\nF,5,10\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//!
//! let schema = df.schema();
//! assert_eq!(schema[0].1, ColumnRole::Categorical);
//! assert_eq!(schema[1].1, ColumnRole::Numeric);
//!
//! let genders = frequency_table(&df, "gender").unwrap();
//! assert_eq!(genders.entries[0].count, 3);
//!
//! let config = AnalysisConfig::default();
//! let corr = correlate(&df, "hours", "score", CorrelationMethod::Pearson, &config).unwrap();
//! assert!((corr.r - 1.0).abs() < 1e-12);
//! assert_eq!(corr.interpretation.to_string(), "strong positive correlation");
//! ```

pub mod charts;
pub mod classify;
pub mod config;
pub mod contingency;
pub mod correlation;
pub mod csv_parser;
pub mod dataframe;
pub mod describe;
pub mod error;
#[cfg(feature = "excel")]
pub mod excel;
pub mod frequency;
pub mod likert;
pub mod report;
pub mod text;
