//! Workbook parser (xlsx / xls)

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use super::{FormatParser, RawRow, RawValue};
use crate::error::{PipelineError, PipelineResult};

/// Reads the first worksheet only, keyed by its first row.
#[derive(Default)]
pub struct SpreadsheetParser;

impl SpreadsheetParser {
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for SpreadsheetParser {
    fn parse(&self, data: &[u8]) -> PipelineResult<Vec<RawRow>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))
            .map_err(|e| PipelineError::MalformedFile(format!("Failed to open workbook: {}", e)))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.len() > 1 {
            debug!(
                sheets = sheet_names.len(),
                first = %sheet_names[0],
                "Workbook has several sheets, only the first is read"
            );
        }

        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| {
                PipelineError::MalformedFile(format!("Failed to read first worksheet: {}", e))
            })?,
            None => return Ok(Vec::new()),
        };

        Ok(rows_from_cells(range.rows()))
    }

    fn format_name(&self) -> &'static str {
        "spreadsheet"
    }
}

/// Convert sheet rows into raw rows, using the first row as headers.
/// Rows without any non-blank cell are skipped.
pub(crate) fn rows_from_cells<'a, I>(mut cells: I) -> Vec<RawRow>
where
    I: Iterator<Item = &'a [Data]>,
{
    let headers: Vec<String> = match cells.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_value(cell).to_text())
            .collect(),
        None => return Vec::new(),
    };

    cells
        .filter_map(|row| {
            let raw: RawRow = headers
                .iter()
                .zip(row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_value(cell)))
                .collect();

            if raw.is_blank() {
                None
            } else {
                Some(raw.normalized())
            }
        })
        .collect()
}

fn cell_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Empty,
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Float(f) if f.is_finite() => RawValue::Number(*f),
        Data::String(s) => RawValue::from_text(s),
        other => RawValue::String(other.to_string()),
    }
}
