// file: src/reader/mod.rs
// description: spreadsheet reading module exports
// reference: internal module structure

pub mod workbook;

pub use workbook::{read_bytes, read_path};
