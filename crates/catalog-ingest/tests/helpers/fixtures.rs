//! Upload file fixtures
//!
//! Workbooks are assembled as minimal OOXML packages: one sheet, inline
//! strings for text cells, plain values for numbers.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

pub const HEADER: &str = "name,description,price,quantity";

/// CSV with the catalog header and the given data lines
pub fn csv_file(lines: &[&str]) -> Vec<u8> {
    let mut content = String::from(HEADER);
    for line in lines {
        content.push('\n');
        content.push_str(line);
    }
    content.push('\n');
    content.into_bytes()
}

/// CSV with `count` valid products
pub fn valid_csv(count: usize) -> Vec<u8> {
    let lines: Vec<String> = (1..=count)
        .map(|i| format!("Product {},Item number {},{}.50,{}", i, i, i, i))
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    csv_file(&refs)
}

/// One workbook cell
#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    Number(f64),
    Blank,
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.to_string())
    }
}

impl From<f64> for Cell {
    fn from(number: f64) -> Self {
        Cell::Number(number)
    }
}

/// Build an `.xlsx` whose first (and only) sheet holds `rows`.
pub fn xlsx_file(rows: &[Vec<Cell>]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows)),
    ];

    for (name, content) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    for (r, row) in rows.iter().enumerate() {
        let row_number = r + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(c), row_number);
            match cell {
                Cell::Text(text) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    reference,
                    escape(text)
                )),
                Cell::Number(number) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, number))
                },
                Cell::Blank => {},
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn column_name(index: usize) -> String {
    let mut name = String::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    name
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Products" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;
