//! Trace ingestion: binary decoding and invocation deduplication.

mod decoder;
mod store;

pub use store::{Invocation, InvocationSet, TraceStore};
