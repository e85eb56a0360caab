// file: src/test_support.rs
// description: fixture workbook builders shared by unit tests
// reference: https://docs.rs/rust_xlsxwriter

use crate::models::{CellValue, NormalizedRow};
use rust_xlsxwriter::Workbook;
use std::path::Path;

pub fn write_workbook(path: &Path, headers: &[&str], rows: &[Vec<CellValue>]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }

    for (r, row) in rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    sheet.write_string(r, col, s.as_str()).unwrap();
                }
                CellValue::Number(n) => {
                    sheet.write_number(r, col, *n).unwrap();
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(r, col, *b).unwrap();
                }
            }
        }
    }

    workbook.save(path).unwrap();
}

/// Standard three-column participant sheet.
pub fn write_scores(path: &Path, rows: &[(&str, &str, f64)]) {
    let rows: Vec<Vec<CellValue>> = rows
        .iter()
        .map(|(name, email, score)| vec![(*name).into(), (*email).into(), (*score).into()])
        .collect();
    write_workbook(path, &["Full Name", "Email", "Score"], &rows);
}

pub fn row(name: &str, email: &str, score: Option<f64>, test: u32) -> NormalizedRow {
    NormalizedRow {
        full_name: name.to_string(),
        email: email.to_string(),
        score,
        source_test: test,
        source_row: 2,
        is_duplicate: false,
    }
}
