// file: src/exporter/mod.rs
// description: output workbook and report export module exports
// reference: internal module structure

pub mod json;
pub mod staging;
pub mod workbook;

pub use json::{JsonExporter, ReportManifest};
pub use staging::StagedOutput;
pub use workbook::{WorkbookExporter, verify};
