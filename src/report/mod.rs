//! Exported results: summary tables (CSV, XLSX) and the combined PDF.

pub mod pdf;
pub mod tables;

pub use pdf::PdfReport;
pub use tables::{descriptive_rows, omnibus_rows, summary_rows, write_csv, write_xlsx, TableRow};
