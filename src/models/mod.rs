pub mod client;
pub mod invoice;
pub mod line_item;
pub mod numeric;

pub use client::{Client, ClientTotal};
pub use invoice::{DateRange, Invoice};
pub use line_item::{InvoiceLineItem, ServiceTotal, TableCounts};
pub use numeric::{NumericError, NumericSpec, AMOUNT, FX_RATE};
