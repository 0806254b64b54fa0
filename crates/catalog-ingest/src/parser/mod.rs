//! Format parsers: raw file bytes to loosely typed rows
//!
//! Parsing is permissive. Absent or blank catalog columns are filled with
//! defaults instead of being dropped, and anything that does not look like a
//! number stays text. Deciding whether a row is acceptable is the validator's
//! job, not the parser's.

pub mod csv;
pub mod spreadsheet;

use std::fmt;

use crate::error::{PipelineError, PipelineResult};

pub use self::csv::CsvParser;
pub use self::spreadsheet::SpreadsheetParser;

/// Catalog columns defaulted to an empty string
pub const TEXT_COLUMNS: [&str; 2] = ["name", "description"];

/// Catalog columns defaulted to zero
pub const NUMERIC_COLUMNS: [&str; 2] = ["price", "quantity"];

/// A single untyped cell
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    Number(f64),
    Empty,
}

impl RawValue {
    /// Type a textual cell: blank becomes `Empty`, finite numbers become
    /// `Number`, everything else stays `String`.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return RawValue::Empty;
        }

        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => RawValue::Number(number),
            _ => RawValue::String(trimmed.to_string()),
        }
    }

    /// Text rendering used for text columns. Integral numbers print without
    /// a fractional part.
    pub fn to_text(&self) -> String {
        match self {
            RawValue::String(s) => s.clone(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::String(s) => s.trim().is_empty(),
            RawValue::Number(_) => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One parsed row: column name to value, in source column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    fields: Vec<(String, RawValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `column`, replacing an earlier value under the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: RawValue) {
        let column = column.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every cell is blank
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.is_empty())
    }

    /// Fill in the catalog columns.
    ///
    /// Text columns become strings (`""` when absent or blank). Numeric
    /// columns become `Number(0.0)` when absent or blank and keep whatever
    /// else they hold, so non-numeric text reaches the validator as text.
    pub fn normalized(mut self) -> Self {
        for column in TEXT_COLUMNS {
            let text = self.get(column).map(RawValue::to_text).unwrap_or_default();
            self.insert(column, RawValue::String(text));
        }

        for column in NUMERIC_COLUMNS {
            let value = match self.get(column) {
                Some(value) if !value.is_empty() => value.clone(),
                _ => RawValue::Number(0.0),
            };
            self.insert(column, value);
        }

        self
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRow {
    fn from_iter<T: IntoIterator<Item = (K, RawValue)>>(iter: T) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Converts a whole file into rows
pub trait FormatParser: Send + Sync {
    fn parse(&self, data: &[u8]) -> PipelineResult<Vec<RawRow>>;

    /// Short name used in logs
    fn format_name(&self) -> &'static str;
}

/// Supported upload formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// `csv` is delimited text, `xlsx`/`xls` are workbooks; anything else is
    /// rejected before a parse is attempted.
    pub fn from_extension(extension: &str) -> PipelineResult<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" => Ok(FileFormat::Spreadsheet),
            other => Err(PipelineError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn parser(self) -> Box<dyn FormatParser> {
        match self {
            FileFormat::Csv => Box::new(CsvParser::new()),
            FileFormat::Spreadsheet => Box::new(SpreadsheetParser::new()),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}
