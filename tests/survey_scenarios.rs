//! End-to-end survey scenarios, starting from CSV text.

use survey_insight::config::AnalysisConfig;
use survey_insight::contingency::{chi_square, AssociationVerdict};
use survey_insight::correlation::{correlate, CorrelationMethod};
use survey_insight::csv_parser::CsvParser;
use survey_insight::dataframe::DataFrame;
use survey_insight::describe::describe;
use survey_insight::error::SurveyError;
use survey_insight::frequency::{frequency_table, Category};
use survey_insight::likert::{quantile_bins, with_composite_score};
use survey_insight::text::{token_frequencies, TextResources};

fn load(csv: &str) -> DataFrame {
    CsvParser::new().parse_str(csv).unwrap()
}

// ── Descriptive statistics ──

#[test]
fn numeric_summary_one_to_five() {
    let df = load("x\n1\n2\n3\n4\n5\n");
    let s = describe(&df, "x").unwrap();
    assert_eq!(s.mean, 3.0);
    assert_eq!(s.median, 3.0);
    assert_eq!(s.min, 1.0);
    assert_eq!(s.max, 5.0);
    assert!((s.std_dev.unwrap() - 2.5f64.sqrt()).abs() < 1e-12);
}

#[test]
fn all_missing_numeric_column_is_no_data() {
    let df = load("x,y\nNA,a\n,b\n");
    assert!(matches!(describe(&df, "x"), Err(SurveyError::NoData { .. })));
}

// ── Frequency tables ──

#[test]
fn frequency_keeps_missing_bucket() {
    let df = load("grade,id\nA,1\nA,2\nB,3\nNA,4\n");
    let t = frequency_table(&df, "grade").unwrap();
    let rows: Vec<(Category, usize, f64)> = t
        .entries
        .iter()
        .map(|e| (e.category.clone(), e.count, e.percent))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Category::Value("A".into()), 2, 50.0),
            (Category::Value("B".into()), 1, 25.0),
            (Category::Missing, 1, 25.0),
        ]
    );
}

// ── Correlation ──

#[test]
fn perfect_pearson_correlation() {
    let df = load("x,y\n1,2\n2,4\n3,6\n4,8\n5,10\n");
    let r = correlate(&df, "x", "y", CorrelationMethod::Pearson, &AnalysisConfig::default()).unwrap();
    assert!((r.r - 1.0).abs() < 1e-12);
    assert!(r.p_value < 1e-6);
}

#[test]
fn correlation_minimum_sample() {
    let config = AnalysisConfig::default();
    let df = load("x,y\n1,1\n2,2\n3,NA\nNA,4\n");
    let r = correlate(&df, "x", "y", CorrelationMethod::Pearson, &config).unwrap();
    assert_eq!(r.n, 2);

    let df = load("x,y\n1,1\n2,NA\nNA,4\n");
    let err = correlate(&df, "x", "y", CorrelationMethod::Spearman, &config).unwrap_err();
    assert!(matches!(err, SurveyError::InsufficientData { min_required: 2, actual: 1 }));
    assert!(err.is_recoverable());
}

#[test]
fn infinite_cells_are_left_out_of_correlation() {
    let df = load("x,y\n1,2\n2,4\ninf,6\n4,8\n");
    let r = correlate(&df, "x", "y", CorrelationMethod::Pearson, &AnalysisConfig::default()).unwrap();
    assert_eq!(r.n, 3);
    assert!((r.r - 1.0).abs() < 1e-12);
}

// ── Chi-square ──

#[test]
fn chi_square_diagonal_table_is_significant() {
    let mut csv = String::from("x,y\n");
    for _ in 0..10 {
        csv.push_str("a,c\nb,d\n");
    }
    let df = load(&csv);
    let config = AnalysisConfig::default();
    let res = chi_square(&df, "x", "y", &config).unwrap();
    assert_eq!(res.table.observed, vec![vec![10, 0], vec![0, 10]]);
    assert!(res.statistic > 10.0);
    assert!(res.p_value < 0.001);
    assert_eq!(res.verdict(&config), AssociationVerdict::Significant);
    assert_eq!(res.verdict(&config).to_string(), "significant association");
}

// ── Text ──

#[test]
fn quick_fox_token_counts() {
    let df = load("comment\n\"The quick, quick fox!\"\n");
    let f = token_frequencies(&df, "comment", 10, TextResources::english()).unwrap();
    let pairs: Vec<(&str, usize)> = f.tokens.iter().map(|t| (t.token.as_str(), t.count)).collect();
    assert_eq!(pairs, vec![("quick", 2), ("fox", 1)]);
}

// ── Likert workflow ──

#[test]
fn composite_scores_feed_association_tests() {
    let csv = "q1,q2,q3,q4\n\
               1 - Never,2 - Rarely,1 - Never,1 - Never\n\
               2 - Rarely,2 - Rarely,2 - Rarely,1 - Never\n\
               3 - Sometimes,3 - Sometimes,3 - Sometimes,4 - Often\n\
               4 - Often,4 - Often,4 - Often,3 - Sometimes\n\
               5 - Always,4 - Often,5 - Always,5 - Always\n\
               5 - Always,5 - Always,4 - Often,5 - Always\n";
    let df = load(csv);
    let df = with_composite_score(&df, "X_total", &["q1", "q2"]).unwrap();
    let df = with_composite_score(&df, "Y_total", &["q3", "q4"]).unwrap();

    let config = AnalysisConfig::default();
    let r = correlate(&df, "X_total", "Y_total", CorrelationMethod::Spearman, &config).unwrap();
    assert!(r.r > 0.8);

    let x_bins = quantile_bins(&df, "X_total", 2).unwrap();
    assert_eq!(x_bins.edges.len(), 3);
}
