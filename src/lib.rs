pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{apply_schema, create_pool};
pub use error::{LedgerError, Result};
pub use service::{IngestService, IngestSummary};
