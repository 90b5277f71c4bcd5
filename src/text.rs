//! Tokenization and word-frequency analysis of free-text answers.
//!
//! Each answer is lowercased, stripped of ASCII punctuation, split on
//! whitespace and filtered down to purely alphabetic tokens that are not
//! stopwords. Missing answers contribute no tokens.
//!
//! # Example
//!
//! ```
//! use survey_insight::csv_parser::CsvParser;
//! use survey_insight::text::{token_frequencies, TextResources};
//!
//! let df = CsvParser::new()
//!     .parse_str("comment\n\"The quick, quick fox!\"\n")
//!     .unwrap();
//! let freq = token_frequencies(&df, "comment", 10, TextResources::english()).unwrap();
//! assert_eq!(freq.tokens[0].token, "quick");
//! assert_eq!(freq.tokens[0].count, 2);
//! assert_eq!(freq.tokens[1].token, "fox");
//! ```

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::Serialize;

use crate::dataframe::{Column, DataFrame};
use crate::error::{Result, SurveyError};

/// English stopwords (the NLTK corpus list).
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// ASCII punctuation removed before splitting.
const ASCII_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

lazy_static! {
    static ref ENGLISH: TextResources =
        TextResources::new(ENGLISH_STOPWORDS.iter().copied(), ASCII_PUNCTUATION.chars());
}

// ── Resources ─────────────────────────────────────────────────────────

/// Stopword and punctuation sets used by the tokenizer.
///
/// Built once and shared read-only; [`TextResources::english`] returns the
/// process-wide default.
#[derive(Debug, Clone)]
pub struct TextResources {
    stopwords: HashSet<String>,
    punctuation: HashSet<char>,
}

impl TextResources {
    pub fn new<'a>(
        stopwords: impl IntoIterator<Item = &'a str>,
        punctuation: impl IntoIterator<Item = char>,
    ) -> Self {
        Self {
            stopwords: stopwords.into_iter().map(str::to_lowercase).collect(),
            punctuation: punctuation.into_iter().collect(),
        }
    }

    /// The English stopword list with ASCII punctuation.
    pub fn english() -> &'static TextResources {
        &*ENGLISH
    }

    /// Returns a copy with `extra` stopwords added (matched lowercase).
    pub fn with_extra_stopwords<S: AsRef<str>>(&self, extra: &[S]) -> TextResources {
        let mut out = self.clone();
        out.stopwords
            .extend(extra.iter().map(|s| s.as_ref().trim().to_lowercase()));
        out
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }

    /// Tokenizes one answer.
    ///
    /// ```
    /// use survey_insight::text::TextResources;
    ///
    /// let tokens = TextResources::english().tokenize("Fast delivery, 10/10 would order again!");
    /// assert_eq!(tokens, vec!["fast", "delivery", "would", "order"]);
    /// ```
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !self.punctuation.contains(c))
            .collect();
        cleaned
            .split_whitespace()
            .filter(|tok| tok.chars().all(char::is_alphabetic))
            .filter(|tok| !self.is_stopword(tok))
            .map(str::to_string)
            .collect()
    }
}

// ── Token frequencies ─────────────────────────────────────────────────

/// A token and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenCount {
    pub token: String,
    pub count: usize,
}

/// Ranked token counts of a text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenFrequencies {
    pub column: String,
    /// At most `top_n` tokens, descending by count; ties in first-seen order.
    pub tokens: Vec<TokenCount>,
    /// Tokens kept across all rows.
    pub total_tokens: usize,
    /// Distinct tokens kept across all rows.
    pub unique_tokens: usize,
}

/// Token lists per row; missing rows give an empty list.
pub fn tokenize_column(
    df: &DataFrame,
    column: &str,
    resources: &TextResources,
) -> Result<Vec<Vec<String>>> {
    let col = text_column(df, column)?;
    Ok((0..col.len())
        .map(|i| col.str_at(i).map(|s| resources.tokenize(s)).unwrap_or_default())
        .collect())
}

/// Counts tokens over every row of `column` and returns the `top_n` most
/// frequent.
pub fn token_frequencies(
    df: &DataFrame,
    column: &str,
    top_n: usize,
    resources: &TextResources,
) -> Result<TokenFrequencies> {
    let rows = tokenize_column(df, column, resources)?;

    // token -> (first-seen position, count)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    let mut total_tokens = 0;
    for token in rows.iter().flatten() {
        total_tokens += 1;
        let next = counts.len();
        counts.entry(token.as_str()).or_insert((next, 0)).1 += 1;
    }
    let unique_tokens = counts.len();

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(tok, (first, count))| (tok, first, count))
        .collect();
    ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.1.cmp(&b.1)));
    ranked.truncate(top_n);

    log::debug!("tokenized '{column}': {total_tokens} tokens, {unique_tokens} distinct");

    Ok(TokenFrequencies {
        column: column.to_string(),
        tokens: ranked
            .into_iter()
            .map(|(token, _, count)| TokenCount {
                token: token.to_string(),
                count,
            })
            .collect(),
        total_tokens,
        unique_tokens,
    })
}

// ── Answer lengths ────────────────────────────────────────────────────

/// Character-length summary of the non-missing answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLengthStats {
    pub column: String,
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub median: f64,
}

/// Summarizes answer lengths in characters.
pub fn text_length_stats(df: &DataFrame, column: &str) -> Result<TextLengthStats> {
    let col = text_column(df, column)?;
    let lengths: Vec<usize> = (0..col.len())
        .filter_map(|i| col.str_at(i))
        .map(|s| s.chars().count())
        .collect();
    let no_data = || SurveyError::NoData {
        column: column.to_string(),
    };
    let as_f64: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();

    Ok(TextLengthStats {
        column: column.to_string(),
        count: lengths.len(),
        min: lengths.iter().copied().min().ok_or_else(no_data)?,
        max: lengths.iter().copied().max().ok_or_else(no_data)?,
        mean: u_numflow::stats::mean(&as_f64).ok_or_else(no_data)?,
        median: u_numflow::stats::median(&as_f64).ok_or_else(no_data)?,
    })
}

/// The first `n` non-missing answers, in row order.
pub fn sample_responses(df: &DataFrame, column: &str, n: usize) -> Result<Vec<String>> {
    let col = text_column(df, column)?;
    Ok((0..col.len())
        .filter_map(|i| col.str_at(i))
        .take(n)
        .map(str::to_string)
        .collect())
}

fn text_column<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Column> {
    let col = df.require_column(column)?;
    if !col.role().is_text_eligible() {
        return Err(SurveyError::InvalidSelection {
            column: column.to_string(),
            reason: format!("{} column cannot be tokenized", col.role()),
        });
    }
    Ok(col)
}

// ── Tests ─────────────────────────────────────────────────────────────
