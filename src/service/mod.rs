pub mod ingest;
pub mod report;

pub use ingest::{IngestService, IngestSummary};
pub use report::{render_markdown, TableRow};
