// file: src/reader/workbook.rs
// description: decodes the first worksheet of an xlsx workbook into a RawTable
// reference: https://docs.rs/calamine

use crate::error::Result;
use crate::models::{CellValue, RawTable};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;

pub fn read_path(path: &Path) -> Result<RawTable> {
    let workbook: Xlsx<_> = open_workbook(path)?;
    let table = read_first_sheet(workbook)?;
    debug!(
        "Read {} headers and {} rows from {}",
        table.headers.len(),
        table.rows.len(),
        path.display()
    );
    Ok(table)
}

/// Reads an uploaded workbook held in memory.
pub fn read_bytes(bytes: &[u8]) -> Result<RawTable> {
    let workbook = Xlsx::new(Cursor::new(bytes))?;
    read_first_sheet(workbook)
}

fn read_first_sheet<RS: Read + Seek>(mut workbook: Xlsx<RS>) -> Result<RawTable> {
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range?,
        None => return Ok(RawTable::default()),
    };

    Ok(range_to_table(&range))
}

fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return RawTable::default(),
    };

    let rows = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    RawTable::new(headers, rows)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

/// Header text keeps surrounding whitespace so the resolver sees it verbatim.
fn header_text(cell: &Data) -> String {
    match convert_cell(cell) {
        CellValue::Text(s) => s,
        other => other.to_text(),
    }
}
