//! Ingest Module - upstream record sources
//!
//! A source yields decoded records one at a time. Decode failures are
//! surfaced per message so the caller can log and move on; `None` means the
//! stream has ended.

pub mod jsonl;

#[cfg(feature = "kafka")]
pub mod kafka;

use async_trait::async_trait;

use crate::logic::error::IngestError;
use crate::logic::record::RawRecord;

pub use jsonl::JsonLinesSource;

#[async_trait]
pub trait RecordSource: Send {
    fn name(&self) -> &str;

    async fn next_record(&mut self) -> Option<Result<RawRecord, IngestError>>;
}
