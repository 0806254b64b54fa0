//! Delimited-text parser

use ::csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use super::{FormatParser, RawRow, RawValue};
use crate::error::{PipelineError, PipelineResult};

/// Header-keyed CSV parser.
///
/// The first line names the columns. Empty lines are skipped and records
/// that cannot be read are logged and skipped; parsing never fails because
/// of a single bad line. A line of bare delimiters is a row like any other
/// and reaches validation with default values.
#[derive(Default)]
pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    fn row_from_record(headers: &StringRecord, record: &StringRecord) -> RawRow {
        if record.len() > headers.len() {
            debug!(
                line = record.position().map(|p| p.line()),
                extra = record.len() - headers.len(),
                "Ignoring fields beyond the header row"
            );
        }

        headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .filter_map(|(idx, header)| {
                record
                    .get(idx)
                    .map(|field| (header.to_string(), RawValue::from_text(field)))
            })
            .collect::<RawRow>()
            .normalized()
    }
}

/// A line with nothing but whitespace on it. `,,,` is not empty.
fn is_empty_line(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

impl FormatParser for CsvParser {
    fn parse(&self, data: &[u8]) -> PipelineResult<Vec<RawRow>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| PipelineError::MalformedFile(format!("CSV is not valid UTF-8: {}", e)))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| PipelineError::MalformedFile(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for result in reader.records() {
            match result {
                Ok(record) => {
                    if is_empty_line(&record) {
                        continue;
                    }
                    rows.push(Self::row_from_record(&headers, &record));
                },
                Err(e) => {
                    skipped += 1;
                    warn!(
                        line = e.position().map(|p| p.line()),
                        error = %e,
                        "CSV parsing warning, skipping record"
                    );
                },
            }
        }

        if skipped > 0 {
            warn!(skipped, parsed = rows.len(), "Some CSV records could not be read");
        }

        Ok(rows)
    }

    fn format_name(&self) -> &'static str {
        "csv"
    }
}
