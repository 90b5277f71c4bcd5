//! Column-major DataFrame for survey responses.
//!
//! The [`DataFrame`] stores named, typed columns with a compact validity
//! bitmap for missing answers. Every analysis borrows it read-only; row
//! filtering builds a new frame.
//!
//! # Column Storage
//!
//! | Role | Storage | Use case |
//! |------|---------|----------|
//! | [`Numeric`](Column::Numeric) | `Vec<f64>` + bitmap | Ages, scores, Likert totals |
//! | [`Categorical`](Column::Categorical) | Dictionary + `Vec<u32>` | Gender, education level |
//! | [`Text`](Column::Text) | `Vec<String>` + bitmap | Free-form comments |
//!
//! # Example
//!
//! ```
//! use survey_insight::dataframe::{Column, DataFrame, ValidityBitmap};
//!
//! let mut df = DataFrame::new();
//! df.add_column(
//!     "age".to_string(),
//!     Column::numeric(vec![21.0, 34.0, 29.0], ValidityBitmap::all_valid(3)),
//! ).unwrap();
//! assert_eq!(df.row_count(), 3);
//! assert_eq!(df.numeric_columns(), vec!["age"]);
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use crate::classify::{parse_numeric, ColumnRole};
use crate::error::{Result, SurveyError};

// ── ValidityBitmap ────────────────────────────────────────────────────

/// Bit-packed validity bitmap: bit set = answer present, clear = missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityBitmap {
    bits: Vec<u64>,
    len: usize,
}

impl ValidityBitmap {
    /// Creates a bitmap where all `len` positions are valid.
    pub fn all_valid(len: usize) -> Self {
        let n_words = len.div_ceil(64);
        let mut bits = vec![u64::MAX; n_words];
        let trailing = len % 64;
        if trailing != 0 && n_words > 0 {
            bits[n_words - 1] = (1u64 << trailing) - 1;
        }
        Self { bits, len }
    }

    /// Creates a bitmap where all `len` positions are missing.
    pub fn all_invalid(len: usize) -> Self {
        Self {
            bits: vec![0u64; len.div_ceil(64)],
            len,
        }
    }

    /// Creates an empty bitmap with no rows.
    pub fn empty() -> Self {
        Self {
            bits: Vec::new(),
            len: 0,
        }
    }

    /// Builds a bitmap from per-row presence flags.
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        let mut bm = Self::empty();
        for valid in flags {
            bm.push(valid);
        }
        bm
    }

    /// Returns `true` if position `idx` holds a value.
    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        (self.bits[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Marks position `idx` as missing.
    #[inline]
    pub fn set_invalid(&mut self, idx: usize) {
        debug_assert!(idx < self.len, "index {idx} out of bounds (len={})", self.len);
        self.bits[idx / 64] &= !(1u64 << (idx % 64));
    }

    /// Appends a new position.
    pub fn push(&mut self, valid: bool) {
        let idx = self.len;
        self.len += 1;
        let word = idx / 64;
        if word >= self.bits.len() {
            self.bits.push(0);
        }
        if valid {
            self.bits[word] |= 1u64 << (idx % 64);
        }
    }

    /// Returns the number of tracked positions.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the bitmap tracks no positions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counts missing positions.
    pub fn null_count(&self) -> usize {
        let valid: usize = self.bits.iter().map(|w| w.count_ones() as usize).sum();
        self.len - valid
    }

    /// Counts present positions.
    pub fn valid_count(&self) -> usize {
        self.len - self.null_count()
    }

    /// Returns an iterator over indices of present positions.
    pub fn valid_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.is_valid(i))
    }
}

// ── Column ────────────────────────────────────────────────────────────

/// A typed column with a validity bitmap for missing answers.
///
/// Missing positions hold a placeholder (0.0, index 0, empty string) that
/// must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Dense `f64` values.
    Numeric {
        values: Vec<f64>,
        validity: ValidityBitmap,
    },
    /// Dictionary-encoded strings; `dictionary` is in first-seen order.
    Categorical {
        dictionary: Vec<String>,
        indices: Vec<u32>,
        validity: ValidityBitmap,
    },
    /// Free-form strings.
    Text {
        values: Vec<String>,
        validity: ValidityBitmap,
    },
}

impl Column {
    pub fn numeric(values: Vec<f64>, validity: ValidityBitmap) -> Self {
        Self::Numeric { values, validity }
    }

    pub fn categorical(dictionary: Vec<String>, indices: Vec<u32>, validity: ValidityBitmap) -> Self {
        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    pub fn text(values: Vec<String>, validity: ValidityBitmap) -> Self {
        Self::Text { values, validity }
    }

    /// Builds a numeric column from optional values; `None` and NaN are missing.
    pub fn from_numbers(values: &[Option<f64>]) -> Self {
        let validity =
            ValidityBitmap::from_flags(values.iter().map(|v| v.is_some_and(|x| !x.is_nan())));
        let values = values
            .iter()
            .map(|v| v.filter(|x| !x.is_nan()).unwrap_or(0.0))
            .collect();
        Self::Numeric { values, validity }
    }

    /// Dictionary-encodes optional strings into a categorical column.
    pub fn from_categories<S: AsRef<str>>(values: &[Option<S>]) -> Self {
        let mut lookup: HashMap<&str, u32> = HashMap::new();
        let mut dictionary: Vec<String> = Vec::new();
        let mut indices = Vec::with_capacity(values.len());
        let mut validity = ValidityBitmap::empty();

        for value in values {
            match value {
                Some(v) => {
                    let v = v.as_ref();
                    let idx = *lookup.entry(v).or_insert_with(|| {
                        dictionary.push(v.to_string());
                        (dictionary.len() - 1) as u32
                    });
                    indices.push(idx);
                    validity.push(true);
                }
                None => {
                    indices.push(0);
                    validity.push(false);
                }
            }
        }

        Self::Categorical {
            dictionary,
            indices,
            validity,
        }
    }

    /// Builds a text column from optional strings.
    pub fn from_texts<S: AsRef<str>>(values: &[Option<S>]) -> Self {
        let validity = ValidityBitmap::from_flags(values.iter().map(Option::is_some));
        let values = values
            .iter()
            .map(|v| v.as_ref().map_or_else(String::new, |s| s.as_ref().to_string()))
            .collect();
        Self::Text { values, validity }
    }

    /// Returns the storage role of this column.
    pub fn role(&self) -> ColumnRole {
        match self {
            Self::Numeric { .. } => ColumnRole::Numeric,
            Self::Categorical { .. } => ColumnRole::Categorical,
            Self::Text { .. } => ColumnRole::Text,
        }
    }

    pub fn len(&self) -> usize {
        self.validity().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validity(&self) -> &ValidityBitmap {
        match self {
            Self::Numeric { validity, .. }
            | Self::Categorical { validity, .. }
            | Self::Text { validity, .. } => validity,
        }
    }

    pub fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    pub fn valid_count(&self) -> usize {
        self.validity().valid_count()
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity().is_valid(idx)
    }

    /// Returns the raw numeric buffer, or `None` if not a numeric column.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Returns the string value at `idx` for categorical and text columns.
    pub fn str_at(&self, idx: usize) -> Option<&str> {
        match self {
            Self::Categorical {
                dictionary,
                indices,
                validity,
            } if validity.is_valid(idx) => dictionary.get(indices[idx] as usize).map(String::as_str),
            Self::Text { values, validity } if validity.is_valid(idx) => Some(&values[idx]),
            _ => None,
        }
    }

    /// Returns the value at `idx` as a display label, or `None` if missing.
    ///
    /// Numbers use the shortest round-trip form, so `3.0` reads `"3"`.
    pub fn label_at(&self, idx: usize) -> Option<Cow<'_, str>> {
        match self {
            Self::Numeric { values, validity } => {
                validity.is_valid(idx).then(|| Cow::Owned(values[idx].to_string()))
            }
            _ => self.str_at(idx).map(Cow::Borrowed),
        }
    }

    /// Returns the value at `idx` coerced to a number.
    ///
    /// String values that do not parse are treated as missing.
    pub fn numeric_at(&self, idx: usize) -> Option<f64> {
        match self {
            Self::Numeric { values, validity } => validity.is_valid(idx).then(|| values[idx]),
            _ => self.str_at(idx).and_then(parse_numeric),
        }
    }

    /// Coerces every row to a number (`None` = missing or unparseable).
    pub fn coerce_numeric(&self) -> Vec<Option<f64>> {
        (0..self.len()).map(|i| self.numeric_at(i)).collect()
    }

    /// Returns the present values coerced to numbers, in row order.
    pub fn valid_numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.numeric_at(i)).collect()
    }

    /// Returns a new column holding only the rows in `rows`, in that order.
    pub fn take(&self, rows: &[usize]) -> Column {
        let validity = ValidityBitmap::from_flags(rows.iter().map(|&r| self.is_valid(r)));
        match self {
            Self::Numeric { values, .. } => Self::Numeric {
                values: rows.iter().map(|&r| values[r]).collect(),
                validity,
            },
            Self::Categorical {
                dictionary,
                indices,
                ..
            } => Self::Categorical {
                dictionary: dictionary.clone(),
                indices: rows.iter().map(|&r| indices[r]).collect(),
                validity,
            },
            Self::Text { values, .. } => Self::Text {
                values: rows.iter().map(|&r| values[r].clone()).collect(),
                validity,
            },
        }
    }
}

// ── DataFrame ─────────────────────────────────────────────────────────

/// Column-major tabular dataset.
///
/// All columns have the same number of rows. Column order is preserved
/// and names are unique.
#[derive(Debug, Clone, Default)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
    row_count: usize,
}

impl DataFrame {
    /// Creates an empty DataFrame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named column.
    ///
    /// Fails if the length differs from the existing row count or the name
    /// is already taken.
    pub fn add_column(&mut self, name: String, column: Column) -> Result<()> {
        let col_len = column.len();
        if self.columns.is_empty() {
            self.row_count = col_len;
        } else if col_len != self.row_count {
            return Err(SurveyError::DimensionMismatch {
                expected: self.row_count,
                actual: col_len,
            });
        }
        if self.names.contains(&name) {
            return Err(SurveyError::InvalidSelection {
                column: name,
                reason: "duplicate column name".to_string(),
            });
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Looks up a column, failing with `InvalidSelection` if absent.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column_by_name(name)
            .ok_or_else(|| SurveyError::column_not_found(name))
    }

    /// Returns an iterator over (name, column) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Returns (name, role) for every column.
    pub fn schema(&self) -> Vec<(&str, ColumnRole)> {
        self.iter().map(|(name, col)| (name, col.role())).collect()
    }

    /// Names of numeric columns, in column order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.names_where(|role| role.is_numeric())
    }

    /// Names of non-numeric columns (offered for frequency tables and
    /// chi-square), in column order.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.names_where(|role| !role.is_numeric())
    }

    /// Names of string-valued columns offered for tokenization.
    pub fn text_columns(&self) -> Vec<&str> {
        self.names_where(ColumnRole::is_text_eligible)
    }

    fn names_where(&self, pred: impl Fn(ColumnRole) -> bool) -> Vec<&str> {
        self.iter()
            .filter(|(_, col)| pred(col.role()))
            .map(|(name, _)| name)
            .collect()
    }

    /// Total number of missing cells across all columns.
    pub fn total_null_count(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }

    /// Returns a new frame with only the rows in `rows`, in that order.
    pub fn take_rows(&self, rows: &[usize]) -> DataFrame {
        DataFrame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// Keeps rows whose value in `column` is one of `allowed` labels.
    ///
    /// Missing values never match. An empty `allowed` list means "no
    /// filter" and returns a copy of the whole frame.
    ///
    /// ```
    /// use survey_insight::csv_parser::CsvParser;
    ///
    /// let df = CsvParser::new()
    ///     .parse_str("gender,age\nF,20\nM,30\nF,40\n")
    ///     .unwrap();
    /// let women = df.filter_by_values("gender", &["F"]).unwrap();
    /// assert_eq!(women.row_count(), 2);
    /// ```
    pub fn filter_by_values<S: AsRef<str>>(&self, column: &str, allowed: &[S]) -> Result<DataFrame> {
        let col = self.require_column(column)?;
        if allowed.is_empty() {
            return Ok(self.clone());
        }
        let rows: Vec<usize> = (0..self.row_count)
            .filter(|&i| {
                col.label_at(i)
                    .is_some_and(|label| allowed.iter().any(|a| a.as_ref() == label))
            })
            .collect();
        log::debug!(
            "filter on '{column}' kept {} of {} rows",
            rows.len(),
            self.row_count
        );
        Ok(self.take_rows(&rows))
    }

    /// Distinct present labels of `column` in first-seen order.
    pub fn unique_values(&self, column: &str) -> Result<Vec<String>> {
        let col = self.require_column(column)?;
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for i in 0..self.row_count {
            if let Some(label) = col.label_at(i) {
                if seen.insert(label.clone()) {
                    out.push(label.into_owned());
                }
            }
        }
        Ok(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> DataFrame {
        let mut df = DataFrame::new();
        df.add_column(
            "age".into(),
            Column::from_numbers(&[Some(21.0), None, Some(35.0), Some(40.0)]),
        )
        .unwrap();
        df.add_column(
            "gender".into(),
            Column::from_categories(&[Some("F"), Some("M"), None, Some("F")]),
        )
        .unwrap();
        df.add_column(
            "comment".into(),
            Column::from_texts(&[Some("good"), None, Some("bad"), Some("ok")]),
        )
        .unwrap();
        df
    }

    // ── ValidityBitmap ───────────────────────────────────────────

    #[test]
    fn bitmap_boundary_64() {
        let bm = ValidityBitmap::all_valid(65);
        assert_eq!(bm.bits.len(), 2);
        assert_eq!(bm.null_count(), 0);
        assert!(bm.is_valid(64));
    }

    #[test]
    fn bitmap_push_and_indices() {
        let bm = ValidityBitmap::from_flags((0..130).map(|i| i % 3 != 0));
        assert_eq!(bm.len(), 130);
        assert!(!bm.is_empty());
        assert!(ValidityBitmap::from_flags(std::iter::empty::<bool>()).is_empty());
        assert_eq!(bm.null_count(), (0..130).filter(|i| i % 3 == 0).count());
        let first: Vec<usize> = bm.valid_indices().take(3).collect();
        assert_eq!(first, vec![1, 2, 4]);
    }

    #[test]
    fn bitmap_set_invalid() {
        let mut bm = ValidityBitmap::all_valid(4);
        bm.set_invalid(2);
        assert!(!bm.is_valid(2));
        assert_eq!(bm.valid_count(), 3);
    }

    // ── Column ───────────────────────────────────────────────────

    #[test]
    fn numeric_labels_and_coercion() {
        let col = Column::from_numbers(&[Some(3.0), None, Some(2.5)]);
        assert_eq!(col.role(), ColumnRole::Numeric);
        assert_eq!(col.label_at(0).as_deref(), Some("3"));
        assert_eq!(col.label_at(1), None);
        assert_eq!(col.label_at(2).as_deref(), Some("2.5"));
        assert_eq!(col.coerce_numeric(), vec![Some(3.0), None, Some(2.5)]);
    }

    #[test]
    fn categorical_dictionary_first_seen() {
        let col = Column::from_categories(&[Some("b"), Some("a"), Some("b"), None]);
        match &col {
            Column::Categorical { dictionary, .. } => assert_eq!(dictionary, &["b", "a"]),
            _ => panic!("expected categorical"),
        }
        assert_eq!(col.str_at(2), Some("b"));
        assert_eq!(col.str_at(3), None);
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn string_values_coerce_to_numbers() {
        let col = Column::from_texts(&[Some("4"), Some("four"), None]);
        assert_eq!(col.coerce_numeric(), vec![Some(4.0), None, None]);
        assert_eq!(col.valid_numeric_values(), vec![4.0]);
    }

    #[test]
    fn take_preserves_validity() {
        let col = Column::from_texts(&[Some("x"), None, Some("z")]);
        let taken = col.take(&[2, 1]);
        assert_eq!(taken.str_at(0), Some("z"));
        assert_eq!(taken.str_at(1), None);
    }

    // ── DataFrame ────────────────────────────────────────────────

    #[test]
    fn length_mismatch_rejected() {
        let mut df = sample_frame();
        let err = df
            .add_column("short".into(), Column::from_numbers(&[Some(1.0)]))
            .unwrap_err();
        assert!(matches!(err, SurveyError::DimensionMismatch { expected: 4, actual: 1 }));
    }

    #[test]
    fn duplicate_name_rejected() {
        let mut df = sample_frame();
        let err = df
            .add_column("age".into(), Column::from_numbers(&[None, None, None, None]))
            .unwrap_err();
        assert!(matches!(err, SurveyError::InvalidSelection { .. }));
    }

    #[test]
    fn role_listings() {
        let df = sample_frame();
        assert_eq!(df.numeric_columns(), vec!["age"]);
        assert_eq!(df.categorical_columns(), vec!["gender", "comment"]);
        assert_eq!(df.text_columns(), vec!["gender", "comment"]);
        assert_eq!(df.total_null_count(), 3);
    }

    #[test]
    fn require_missing_column() {
        let df = sample_frame();
        let err = df.require_column("income").unwrap_err();
        assert_eq!(err, SurveyError::column_not_found("income"));
    }

    #[test]
    fn filter_rows_by_label() {
        let df = sample_frame();
        let f = df.filter_by_values("gender", &["F"]).unwrap();
        assert_eq!(f.row_count(), 2);
        let age = f.column_by_name("age").unwrap();
        assert_eq!(age.valid_numeric_values(), vec![21.0, 40.0]);

        let unfiltered = df.filter_by_values::<&str>("gender", &[]).unwrap();
        assert_eq!(unfiltered.row_count(), 4);
    }

    #[test]
    fn unique_values_first_seen() {
        let df = sample_frame();
        assert_eq!(df.unique_values("gender").unwrap(), vec!["F", "M"]);
    }
}
