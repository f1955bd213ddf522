pub mod pool;
pub mod queries;
pub mod schema;

pub use pool::{create_pool, ping};
pub use schema::{apply_schema, describe_schema, SchemaReport};
