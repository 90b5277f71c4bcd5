//! Excel (.xlsx/.xls/.ods) ingestion, enabled with the `excel` feature.
//!
//! Cells are rendered to strings and go through the same null handling and
//! role inference as the CSV reader.

use std::path::Path;

use calamine::{open_workbook_auto, DataType as Cell, Reader};

use crate::csv_parser::build_column;
use crate::dataframe::DataFrame;
use crate::error::{Result, SurveyError};

/// Reads one worksheet (the first one when `sheet_name` is `None`) whose
/// first row holds the column names.
///
/// ```no_run
/// use survey_insight::excel::read_excel;
///
/// let df = read_excel("responses.xlsx", None).unwrap();
/// println!("{} respondents", df.row_count());
/// ```
pub fn read_excel(path: impl AsRef<Path>, sheet_name: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path.as_ref())
        .map_err(|e| SurveyError::Excel(format!("cannot open workbook: {e}")))?;

    let sheet_name = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SurveyError::Excel("workbook has no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SurveyError::Excel(format!("cannot read sheet '{sheet_name}': {e}")))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.to_string().trim().to_string()).collect(),
        None => return Ok(DataFrame::new()),
    };

    let mut raw_columns: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for row in rows {
        for (col_idx, raw) in raw_columns.iter_mut().enumerate() {
            raw.push(row.get(col_idx).and_then(cell_text));
        }
    }

    let mut df = DataFrame::new();
    for (name, raw) in headers.into_iter().zip(raw_columns) {
        df.add_column(name, build_column(&raw))?;
    }
    log::debug!(
        "read sheet '{sheet_name}': {} rows x {} columns",
        df.row_count(),
        df.column_count()
    );
    Ok(df)
}

fn cell_text(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty | Cell::Error(_) => None,
        other => {
            let text = other.to_string();
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
    }
}
