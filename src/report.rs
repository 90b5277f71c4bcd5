//! Survey report assembly.
//!
//! [`build_report`] runs every analysis the dashboard's export offers over a
//! dataset and collects the results, chart data and a few plain-language
//! highlights into one serializable [`SurveyReport`]. Layout and pagination
//! belong to whoever renders it.
//!
//! Sections that cannot be computed for a column (no numeric values, too few
//! rows, a constant variable) are left out and logged; ingestion-level
//! errors still propagate.
//!
//! # Example
//!
//! ```
//! use survey_insight::config::AnalysisConfig;
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::report::build_report;
//!
//! let csv = "comment,gender,age,score\n\
//!            great service,F,21,4\n\
//!            slow delivery,M,34,3\n\
//!            great prices,F,29,5\n\
//!            delivery was late,M,41,2\n\
//!            friendly staff,F,25,4\n\
//!            great app,M,38,3\n";
//! let df = CsvParser::new().parse_str(csv).unwrap();
//! let report = build_report(&df, &AnalysisConfig::default()).unwrap();
//!
//! assert_eq!(report.overview.rows, 6);
//! assert_eq!(report.numeric.len(), 2);
//! assert_eq!(report.text[0].tokens.tokens[0].token, "great");
//! assert!(report.to_json().unwrap().contains("\"overview\""));
//! ```

use std::borrow::Cow;

use serde::Serialize;

use crate::charts::{
    bar_chart, box_plot, histogram, scatter_plot, stacked_bar_chart, BarChart, BoxPlot, Chart,
    Histogram, ScatterPlot, StackedBarChart,
};
use crate::classify::ColumnRole;
use crate::config::AnalysisConfig;
use crate::contingency::{chi_square_table, crosstab, ChiSquareResult, ContingencyTable};
use crate::correlation::{correlation_matrix, CorrelationMatrix, CorrelationMethod, CorrelationPair};
use crate::dataframe::DataFrame;
use crate::describe::{column_normality, describe, DescriptiveSummary, NormalityResult};
use crate::error::Result;
use crate::frequency::{frequency_table, FrequencyTable};
use crate::text::{
    sample_responses, text_length_stats, token_frequencies, TextLengthStats, TextResources,
    TokenFrequencies,
};

/// Bins in report histograms.
const HISTOGRAM_BINS: usize = 20;
/// Bars per categorical bar chart.
const BAR_LIMIT: usize = 10;
/// Sample answers quoted per text column.
const TEXT_SAMPLES: usize = 5;
/// Consecutive numeric pairs drawn as scatter plots.
const SCATTER_PAIRS: usize = 3;
/// Highlights drawn from each section.
const INSIGHTS_PER_SECTION: usize = 3;

// ── Report types ──────────────────────────────────────────────────────

/// Shape of the dataset and the role of each column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub text_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSection {
    pub summary: DescriptiveSummary,
    /// `None` below the minimum sample size or for constant data.
    pub normality: Option<NormalityResult>,
    pub histogram: Histogram,
    pub box_plot: BoxPlot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalSection {
    /// Truncated to the configured number of categories.
    pub table: FrequencyTable,
    /// Categories before truncation, missing bucket included.
    pub distinct_categories: usize,
    /// Non-missing answers.
    pub answered: usize,
    pub bar_chart: BarChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabSection {
    pub table: ContingencyTable,
    pub row_percentages: Vec<Vec<f64>>,
    /// `None` when the table has a single row or column.
    pub chi_square: Option<ChiSquareResult>,
    pub chart: StackedBarChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationSection {
    pub matrix: CorrelationMatrix,
    pub top_pairs: Vec<CorrelationPair>,
    /// Consecutive numeric column pairs.
    pub scatter_plots: Vec<ScatterPlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSection {
    pub tokens: TokenFrequencies,
    pub lengths: Option<TextLengthStats>,
    pub samples: Vec<String>,
}

/// Everything the survey export contains, in section order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyReport {
    pub overview: DatasetOverview,
    pub numeric: Vec<NumericSection>,
    pub frequencies: Vec<CategoricalSection>,
    pub crosstabs: Vec<CrosstabSection>,
    pub correlation: Option<CorrelationSection>,
    pub text: Vec<TextSection>,
    /// Plain-language highlights.
    pub insights: Vec<String>,
}

impl SurveyReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every chart in the report, in section order.
    pub fn charts(&self) -> Vec<Chart> {
        let mut charts = Vec::new();
        for section in &self.numeric {
            charts.push(Chart::Histogram(section.histogram.clone()));
            charts.push(Chart::BoxPlot(section.box_plot.clone()));
        }
        if let Some(corr) = &self.correlation {
            charts.extend(corr.scatter_plots.iter().cloned().map(Chart::Scatter));
        }
        charts.extend(
            self.frequencies
                .iter()
                .map(|s| Chart::Bar(s.bar_chart.clone())),
        );
        charts.extend(self.crosstabs.iter().map(|s| Chart::StackedBar(s.chart.clone())));
        charts
    }
}

// ── Assembly ──────────────────────────────────────────────────────────

/// Builds the full report for `df`.
pub fn build_report(df: &DataFrame, config: &AnalysisConfig) -> Result<SurveyReport> {
    config.validate()?;
    let limits = &config.report;

    let overview = overview(df);
    log::info!(
        "building report: {} rows, {} numeric / {} categorical / {} text columns",
        overview.rows,
        overview.numeric_columns.len(),
        overview.categorical_columns.len(),
        overview.text_columns.len()
    );

    let mut numeric = Vec::new();
    for column in overview.numeric_columns.iter().take(limits.numeric_columns) {
        if let Some(section) = skip_recoverable(numeric_section(df, column, config), column)? {
            numeric.push(section);
        }
    }

    let categorical = df.categorical_columns();
    let mut frequencies = Vec::new();
    for &column in &categorical {
        let table = frequency_table(df, column)?;
        let distinct_categories = table.entries.len();
        let answered = table.total_rows - table.missing_count();
        let bar = bar_chart(&table, BAR_LIMIT);
        frequencies.push(CategoricalSection {
            table: FrequencyTable {
                entries: table.top(limits.categories_per_table).to_vec(),
                ..table
            },
            distinct_categories,
            answered,
            bar_chart: bar,
        });
    }

    let mut crosstabs = Vec::new();
    for pair in categorical.windows(2).take(limits.crosstab_pairs) {
        let label = format!("{} x {}", pair[0], pair[1]);
        let section = skip_recoverable(crosstab_section(df, pair[0], pair[1], config), &label)?;
        if let Some(section) = section {
            crosstabs.push(section);
        }
    }

    let correlation = if overview.numeric_columns.len() >= 2 {
        skip_recoverable(
            correlation_section(df, &overview.numeric_columns, config),
            "correlation matrix",
        )?
    } else {
        None
    };

    let resources: Cow<'_, TextResources> = if config.extra_stopwords.is_empty() {
        Cow::Borrowed(TextResources::english())
    } else {
        Cow::Owned(TextResources::english().with_extra_stopwords(config.extra_stopwords.as_slice()))
    };
    let mut text = Vec::new();
    for column in df.text_columns().into_iter().take(limits.text_columns) {
        text.push(TextSection {
            tokens: token_frequencies(df, column, config.top_n_tokens, &resources)?,
            lengths: skip_recoverable(text_length_stats(df, column), column)?,
            samples: sample_responses(df, column, TEXT_SAMPLES)?,
        });
    }

    let mut report = SurveyReport {
        overview,
        numeric,
        frequencies,
        crosstabs,
        correlation,
        text,
        insights: Vec::new(),
    };
    report.insights = insights(&report, config);
    Ok(report)
}

fn overview(df: &DataFrame) -> DatasetOverview {
    let by_role = |role: ColumnRole| -> Vec<String> {
        df.schema()
            .into_iter()
            .filter(|(_, r)| *r == role)
            .map(|(name, _)| name.to_string())
            .collect()
    };
    DatasetOverview {
        rows: df.row_count(),
        columns: df.column_count(),
        missing_cells: df.total_null_count(),
        numeric_columns: by_role(ColumnRole::Numeric),
        categorical_columns: by_role(ColumnRole::Categorical),
        text_columns: by_role(ColumnRole::Text),
    }
}

fn numeric_section(df: &DataFrame, column: &str, config: &AnalysisConfig) -> Result<NumericSection> {
    let summary = describe(df, column)?;
    let normality = skip_recoverable(column_normality(df, column, config), column)?;
    Ok(NumericSection {
        summary,
        normality,
        histogram: histogram(df, column, HISTOGRAM_BINS)?,
        box_plot: box_plot(df, column)?,
    })
}

fn crosstab_section(
    df: &DataFrame,
    x: &str,
    y: &str,
    config: &AnalysisConfig,
) -> Result<CrosstabSection> {
    let table = crosstab(df, x, y)?;
    let chi_square = if table.row_labels.len() > 1 && table.col_labels.len() > 1 {
        Some(chi_square_table(table.clone(), config)?)
    } else {
        None
    };
    Ok(CrosstabSection {
        row_percentages: table.row_percentages(),
        chart: stacked_bar_chart(&table),
        table,
        chi_square,
    })
}

fn correlation_section(
    df: &DataFrame,
    columns: &[String],
    config: &AnalysisConfig,
) -> Result<CorrelationSection> {
    let matrix = correlation_matrix(df, columns, CorrelationMethod::Pearson, config)?;
    let top_pairs = matrix.top_pairs(config.report.correlation_pairs);
    let mut scatter_plots = Vec::new();
    for pair in columns.windows(2).take(SCATTER_PAIRS) {
        let label = format!("{} vs {}", pair[0], pair[1]);
        if let Some(plot) = skip_recoverable(scatter_plot(df, &pair[0], &pair[1]), &label)? {
            scatter_plots.push(plot);
        }
    }
    Ok(CorrelationSection {
        matrix,
        top_pairs,
        scatter_plots,
    })
}

/// Turns a recoverable analysis error into `None`.
fn skip_recoverable<T>(result: Result<T>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_recoverable() => {
            log::warn!("report: skipping {what}: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// ── Insights ──────────────────────────────────────────────────────────

fn insights(report: &SurveyReport, config: &AnalysisConfig) -> Vec<String> {
    let mut bullets = Vec::new();

    for section in report.numeric.iter().take(INSIGHTS_PER_SECTION) {
        let s = &section.summary;
        let std = s
            .std_dev
            .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
        bullets.push(format!(
            "{}: mean={:.2}, median={:.2}, std={std}, range=({:.2} to {:.2})",
            s.column, s.mean, s.median, s.min, s.max
        ));
    }

    for section in report.frequencies.iter().take(INSIGHTS_PER_SECTION) {
        let table = &section.table;
        let answered = section.answered;
        if answered == 0 {
            continue;
        }
        let parts: Vec<String> = table
            .non_missing()
            .take(INSIGHTS_PER_SECTION)
            .map(|e| {
                format!(
                    "{} ({:.1}%)",
                    e.category,
                    100.0 * e.count as f64 / answered as f64
                )
            })
            .collect();
        bullets.push(format!("{}: top categories: {}", table.column, parts.join(", ")));
    }

    if let Some(corr) = &report.correlation {
        for pair in corr.top_pairs.iter().take(INSIGHTS_PER_SECTION) {
            bullets.push(format!(
                "{} and {}: r={:.3}, {}",
                pair.x, pair.y, pair.r, pair.interpretation
            ));
        }
    }

    for section in &report.crosstabs {
        if let Some(chi) = &section.chi_square {
            if chi.is_significant(config.alpha) {
                bullets.push(format!(
                    "{} x {}: {} (chi-square={:.3}, p={:.4})",
                    chi.table.row_variable,
                    chi.table.col_variable,
                    chi.verdict(config),
                    chi.statistic,
                    chi.p_value
                ));
            }
        }
    }

    if bullets.is_empty() {
        bullets.push("No notable patterns found in the data.".to_string());
    }
    bullets
}

// ── Tests ─────────────────────────────────────────────────────────────
