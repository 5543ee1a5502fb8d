//! Run outputs: the CSV event report and the end-of-run summary.

mod csv_report;
mod summary;

pub use csv_report::{report_path, sanitize_file_name, CsvReport};
pub use summary::RunSummary;
