pub mod use_cases;

pub use use_cases::line_sanitizer::LineSanitizer;
pub use use_cases::table_exporter::TableExporter;
