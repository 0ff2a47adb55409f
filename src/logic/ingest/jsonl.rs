//! JSON lines source (one record object per line)

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use super::RecordSource;
use crate::logic::error::IngestError;
use crate::logic::record::RawRecord;

pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: u64,
}

impl JsonLinesSource<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

#[async_trait]
impl<R> RecordSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        "stdin"
    }

    async fn next_record(&mut self) -> Option<Result<RawRecord, IngestError>> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(IngestError::Transport(e.to_string()))),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(RawRecord::from_json(line.as_bytes()).map_err(|e| {
                log::debug!("line {} rejected: {}", self.line_no, e);
                e
            }));
        }
    }
}
