//! Chart data series and the renderer hook.
//!
//! The engine does not draw. It computes the numbers behind each chart the
//! dashboard shows and hands them to a [`ChartRenderer`] implemented by the
//! presentation layer. [`TextRenderer`] is a plain-text implementation for
//! terminals and logs.
//!
//! ```
//! use survey_insight::charts::{histogram, Chart, ChartRenderer, TextRenderer};
//! use survey_insight::csv_parser::CsvParser;
//!
//! let df = CsvParser::new().parse_str("age\n21\n25\n25\n30\n41\n").unwrap();
//! let hist = histogram(&df, "age", 4).unwrap();
//! assert_eq!(hist.counts.iter().sum::<usize>(), 5);
//!
//! let text = TextRenderer::new(20).render(&Chart::Histogram(hist)).unwrap();
//! assert!(text.starts_with("Histogram: age"));
//! ```

use serde::Serialize;
use u_analytics::distribution::{histogram_bins, BinMethod};

use crate::contingency::ContingencyTable;
use crate::dataframe::DataFrame;
use crate::error::{Result, SurveyError};
use crate::frequency::FrequencyTable;

/// Tukey fence multiplier for box-plot whiskers.
const WHISKER_IQR: f64 = 1.5;

// ── Histogram ─────────────────────────────────────────────────────────

/// Equal-width histogram of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub column: String,
    pub bin_width: f64,
    /// Bin edges (length = counts.len() + 1).
    pub edges: Vec<f64>,
    /// Observations per bin; the last bin includes its upper edge.
    pub counts: Vec<usize>,
}

/// Splits the present values of `column` into `bins` equal-width bins
/// spanning min..max. A constant column gets bins spanning value ± 0.5.
pub fn histogram(df: &DataFrame, column: &str, bins: usize) -> Result<Histogram> {
    if bins == 0 {
        return Err(SurveyError::InvalidSelection {
            column: column.to_string(),
            reason: "histogram needs at least one bin".to_string(),
        });
    }
    let values = numeric_values(df, column)?;
    let no_data = || SurveyError::NoData {
        column: column.to_string(),
    };
    let lo = u_numflow::stats::min(&values).ok_or_else(no_data)?;
    let hi = u_numflow::stats::max(&values).ok_or_else(no_data)?;
    if lo == hi {
        return Ok(constant_histogram(column, lo, values.len(), bins));
    }

    let result = histogram_bins(&values, BinMethod::Fixed(bins)).ok_or_else(|| {
        SurveyError::undefined(format!("cannot bin '{column}' into {bins} bins"))
    })?;
    Ok(Histogram {
        column: column.to_string(),
        bin_width: result.bin_width,
        edges: result.edges,
        counts: result.counts,
    })
}

fn constant_histogram(column: &str, value: f64, count: usize, bins: usize) -> Histogram {
    let bin_width = 1.0 / bins as f64;
    let lo = value - 0.5;
    let edges = (0..=bins).map(|i| lo + bin_width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    counts[(bins / 2).min(bins - 1)] = count;
    Histogram {
        column: column.to_string(),
        bin_width,
        edges,
        counts,
    }
}

// ── Box plot ──────────────────────────────────────────────────────────

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxPlot {
    pub column: String,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value within Q1 − 1.5·IQR.
    pub lower_whisker: f64,
    /// Largest value within Q3 + 1.5·IQR.
    pub upper_whisker: f64,
    /// Values beyond the whiskers, ascending.
    pub outliers: Vec<f64>,
}

pub fn box_plot(df: &DataFrame, column: &str) -> Result<BoxPlot> {
    let mut values = numeric_values(df, column)?;
    values.sort_by(f64::total_cmp);
    let no_data = || SurveyError::NoData {
        column: column.to_string(),
    };

    let q1 = u_numflow::stats::quantile(&values, 0.25).ok_or_else(no_data)?;
    let median = u_numflow::stats::median(&values).ok_or_else(no_data)?;
    let q3 = u_numflow::stats::quantile(&values, 0.75).ok_or_else(no_data)?;
    let iqr = q3 - q1;
    let (lower, upper) = (q1 - WHISKER_IQR * iqr, q3 + WHISKER_IQR * iqr);

    let inside = values.iter().copied().filter(|&v| v >= lower && v <= upper);
    let lower_whisker = inside.clone().next().unwrap_or(q1);
    let upper_whisker = inside.last().unwrap_or(q3);
    let outliers = values
        .iter()
        .copied()
        .filter(|&v| v < lower || v > upper)
        .collect();

    Ok(BoxPlot {
        column: column.to_string(),
        q1,
        median,
        q3,
        lower_whisker,
        upper_whisker,
        outliers,
    })
}

// ── Bar charts ────────────────────────────────────────────────────────

/// Category counts, in table order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub column: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Bars for the first `limit` observed categories (missing excluded).
pub fn bar_chart(table: &FrequencyTable, limit: usize) -> BarChart {
    let (labels, values) = table
        .non_missing()
        .take(limit)
        .map(|e| (e.category.to_string(), e.count as f64))
        .unzip();
    BarChart {
        column: table.column.clone(),
        labels,
        values,
    }
}

/// Row-percentage bars of a contingency table; one series per column label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedBarChart {
    pub row_variable: String,
    pub col_variable: String,
    pub categories: Vec<String>,
    /// `(column label, percent per row category)`.
    pub series: Vec<(String, Vec<f64>)>,
}

pub fn stacked_bar_chart(table: &ContingencyTable) -> StackedBarChart {
    let pct = table.row_percentages();
    let series = table
        .col_labels
        .iter()
        .enumerate()
        .map(|(j, label)| (label.clone(), pct.iter().map(|row| row[j]).collect()))
        .collect();
    StackedBarChart {
        row_variable: table.row_variable.clone(),
        col_variable: table.col_variable.clone(),
        categories: table.row_labels.clone(),
        series,
    }
}

// ── Scatter plot ──────────────────────────────────────────────────────

/// Complete-case points of two numeric columns with a least-squares line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPlot {
    pub x: String,
    pub y: String,
    pub points: Vec<(f64, f64)>,
    /// `(slope, intercept)`; `None` when x is constant.
    pub trend: Option<(f64, f64)>,
}

pub fn scatter_plot(df: &DataFrame, x: &str, y: &str) -> Result<ScatterPlot> {
    let xs = df.require_column(x)?.coerce_numeric();
    let ys = df.require_column(y)?.coerce_numeric();
    let points: Vec<(f64, f64)> = xs
        .into_iter()
        .zip(ys)
        .filter_map(|(a, b)| Some((a?, b?)))
        .collect();
    if points.len() < 2 {
        return Err(SurveyError::InsufficientData {
            min_required: 2,
            actual: points.len(),
        });
    }

    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
    let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    let trend = (sxx > 0.0).then(|| {
        let slope = sxy / sxx;
        (slope, my - slope * mx)
    });

    Ok(ScatterPlot {
        x: x.to_string(),
        y: y.to_string(),
        points,
        trend,
    })
}

fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<f64>> {
    let values = df.require_column(column)?.valid_numeric_values();
    if values.is_empty() {
        return Err(SurveyError::NoData {
            column: column.to_string(),
        });
    }
    Ok(values)
}

// ── Rendering ─────────────────────────────────────────────────────────

/// Any chart the engine produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chart {
    Histogram(Histogram),
    BoxPlot(BoxPlot),
    Bar(BarChart),
    StackedBar(StackedBarChart),
    Scatter(ScatterPlot),
}

impl Chart {
    pub fn title(&self) -> String {
        match self {
            Self::Histogram(h) => format!("Histogram: {}", h.column),
            Self::BoxPlot(b) => format!("Box plot: {}", b.column),
            Self::Bar(b) => format!("Frequency: {}", b.column),
            Self::StackedBar(s) => format!("{} vs {} (%)", s.row_variable, s.col_variable),
            Self::Scatter(s) => format!("Scatter: {} vs {}", s.x, s.y),
        }
    }
}

/// Draws charts for a presentation layer (image backend, PDF writer, ...).
pub trait ChartRenderer {
    type Output;

    fn render(&mut self, chart: &Chart) -> Result<Self::Output>;
}

/// Renders charts as plain-text bars.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    width: usize,
}

impl TextRenderer {
    /// `width` is the length of the longest bar in characters.
    pub fn new(width: usize) -> Self {
        Self { width: width.max(1) }
    }

    fn bars(&self, out: &mut String, rows: &[(String, f64)]) {
        let max = rows.iter().map(|r| r.1).fold(0.0, f64::max);
        let label_width = rows.iter().map(|r| r.0.chars().count()).max().unwrap_or(0);
        for (label, value) in rows {
            let len = if max > 0.0 {
                ((value / max) * self.width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{label:<label_width$} | {} {value}\n",
                "#".repeat(len)
            ));
        }
    }
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self::new(40)
    }
}

impl ChartRenderer for TextRenderer {
    type Output = String;

    fn render(&mut self, chart: &Chart) -> Result<String> {
        let mut out = format!("{}\n", chart.title());
        match chart {
            Chart::Histogram(h) => {
                let rows: Vec<(String, f64)> = h
                    .counts
                    .iter()
                    .enumerate()
                    .map(|(i, &c)| {
                        let label = format!("[{:.2}, {:.2}]", h.edges[i], h.edges[i + 1]);
                        (label, c as f64)
                    })
                    .collect();
                self.bars(&mut out, &rows);
            }
            Chart::BoxPlot(b) => {
                out.push_str(&format!(
                    "whiskers {} .. {}, Q1 {}, median {}, Q3 {}, {} outliers\n",
                    b.lower_whisker,
                    b.upper_whisker,
                    b.q1,
                    b.median,
                    b.q3,
                    b.outliers.len()
                ));
            }
            Chart::Bar(b) => {
                let rows: Vec<(String, f64)> =
                    b.labels.iter().cloned().zip(b.values.iter().copied()).collect();
                self.bars(&mut out, &rows);
            }
            Chart::StackedBar(s) => {
                for (i, category) in s.categories.iter().enumerate() {
                    let parts: Vec<String> = s
                        .series
                        .iter()
                        .map(|(label, pct)| format!("{label} {:.1}%", pct[i]))
                        .collect();
                    out.push_str(&format!("{category}: {}\n", parts.join(", ")));
                }
            }
            Chart::Scatter(s) => {
                out.push_str(&format!("{} points", s.points.len()));
                if let Some((slope, intercept)) = s.trend {
                    out.push_str(&format!(", trend y = {slope:.3}x + {intercept:.3}"));
                }
                out.push('\n');
            }
        }
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::Column;
    use crate::frequency::frequency_table;

    fn numeric(values: &[Option<f64>]) -> DataFrame {
        let mut df = DataFrame::new();
        df.add_column("v".into(), Column::from_numbers(values)).unwrap();
        df
    }

    // ── Histogram ──

    #[test]
    fn histogram_counts() {
        let df = numeric(&[Some(0.0), Some(1.0), Some(2.0), Some(3.0), Some(4.0), None]);
        let h = histogram(&df, "v", 2).unwrap();
        assert_eq!(h.edges, vec![0.0, 2.0, 4.0]);
        assert_eq!(h.counts, vec![2, 3]);
    }

    #[test]
    fn histogram_constant() {
        let df = numeric(&[Some(5.0), Some(5.0)]);
        let h = histogram(&df, "v", 1).unwrap();
        assert_eq!(h.edges, vec![4.5, 5.5]);
        assert_eq!(h.counts, vec![2]);

        let h = histogram(&df, "v", 4).unwrap();
        assert_eq!(h.counts, vec![0, 0, 2, 0]);
    }

    #[test]
    fn histogram_errors() {
        let df = numeric(&[None]);
        assert!(matches!(histogram(&df, "v", 3), Err(SurveyError::NoData { .. })));
        assert!(matches!(
            histogram(&df, "v", 0),
            Err(SurveyError::InvalidSelection { .. })
        ));
    }

    // ── Box plot ──

    #[test]
    fn box_plot_outlier() {
        let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 2.5, 100.0, 2.0, 3.0, 2.0]
            .iter()
            .copied()
            .map(Some)
            .collect();
        let b = box_plot(&numeric(&values), "v").unwrap();
        assert_eq!(b.outliers, vec![100.0]);
        assert_eq!(b.upper_whisker, 3.0);
        assert_eq!(b.lower_whisker, 1.0);
        assert!(b.q1 <= b.median && b.median <= b.q3);
    }

    // ── Bars ──

    #[test]
    fn bar_chart_skips_missing() {
        let mut df = DataFrame::new();
        df.add_column(
            "c".into(),
            Column::from_categories(&[None, None, None, Some("a"), Some("b"), Some("a")]),
        )
        .unwrap();
        let bars = bar_chart(&frequency_table(&df, "c").unwrap(), 10);
        assert_eq!(bars.labels, vec!["a", "b"]);
        assert_eq!(bars.values, vec![2.0, 1.0]);
    }

    #[test]
    fn stacked_series_per_column_label() {
        let table = ContingencyTable {
            row_variable: "g".into(),
            col_variable: "a".into(),
            row_labels: vec!["x".into(), "y".into()],
            col_labels: vec!["no".into(), "yes".into()],
            observed: vec![vec![1, 3], vec![2, 2]],
        };
        let chart = stacked_bar_chart(&table);
        assert_eq!(chart.series[0], ("no".to_string(), vec![25.0, 50.0]));
        assert_eq!(chart.series[1], ("yes".to_string(), vec![75.0, 50.0]));
    }

    // ── Scatter ──

    #[test]
    fn scatter_trend_line() {
        let mut df = numeric(&[Some(1.0), Some(2.0), Some(3.0), None]);
        df.add_column(
            "w".into(),
            Column::from_numbers(&[Some(3.0), Some(5.0), Some(7.0), Some(9.0)]),
        )
        .unwrap();
        let s = scatter_plot(&df, "v", "w").unwrap();
        assert_eq!(s.points.len(), 3);
        let (slope, intercept) = s.trend.unwrap();
        assert!((slope - 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);
    }

    // ── Rendering ──

    #[test]
    fn text_renderer_scales_bars() {
        let chart = Chart::Bar(BarChart {
            column: "c".into(),
            labels: vec!["a".into(), "bb".into()],
            values: vec![4.0, 2.0],
        });
        let out = TextRenderer::new(4).render(&chart).unwrap();
        assert_eq!(out, "Frequency: c\na  | #### 4\nbb | ## 2\n");
    }

    #[test]
    fn chart_serializes_with_kind_tag() {
        let chart = Chart::Bar(BarChart {
            column: "c".into(),
            labels: vec![],
            values: vec![],
        });
        let json = serde_json::to_string(&chart).unwrap();
        assert!(json.contains("\"kind\":\"bar\""));
    }
}
