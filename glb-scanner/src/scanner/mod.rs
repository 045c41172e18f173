//! Batch scanning of the ticker universe.
//!
//! - **engine**: batching, retry handling and result accumulation
//! - **result**: output records and ordering
//! - **webhook**: live push of detected signals

mod engine;
mod result;
mod webhook;

pub use engine::ScanOrchestrator;
pub use result::{sort_records, ErrorRecord, ScanResult};
pub use webhook::{SignalSink, WebhookSink};
