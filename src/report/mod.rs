//! Report rendering: Markdown, JSON and CSV.

mod csv;
mod generator;

pub use csv::write_csv_tables;
pub use generator::{generate_json_report, generate_markdown_report};
