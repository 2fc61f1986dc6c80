//! Line feed into pumps
//!
//! Reads newline-delimited JSON analytics records and writes them to every
//! active pump in fixed-size batches, plus one final partial batch at end of
//! input. A batch holding a line that fails to decode, either as JSON or as a
//! record, is dropped whole.

use crate::analytics::decode_lines;
use crate::error::Result;
use crate::registry::PumpRegistry;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Counters for one feed run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedSummary {
    /// Batches handed to the registry
    pub batches: usize,
    /// Records in those batches
    pub records: usize,
    /// Batches dropped because a line failed to decode
    pub dropped_batches: usize,
}

/// Feed records from `reader` into `registry` until end of input or cancellation
///
/// Blank lines are ignored. After cancellation any partial batch is discarded.
///
/// # Errors
/// Returns `PumpError::Io` if reading from `reader` fails
pub async fn run_feed<R>(
    reader: R,
    registry: &PumpRegistry,
    cancel: &CancellationToken,
    batch_size: usize,
) -> Result<FeedSummary>
where
    R: AsyncBufRead + Unpin,
{
    let batch_size = batch_size.max(1);
    let mut lines = reader.lines();
    let mut batch: Vec<String> = Vec::with_capacity(batch_size);
    let mut summary = FeedSummary::default();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        batch.push(line);
        if batch.len() >= batch_size {
            flush(registry, cancel, &mut batch, &mut summary).await;
        }
    }

    if !batch.is_empty() {
        if cancel.is_cancelled() {
            info!(count = batch.len(), "Discarding partial batch after cancellation");
        } else {
            flush(registry, cancel, &mut batch, &mut summary).await;
        }
    }

    Ok(summary)
}

async fn flush(
    registry: &PumpRegistry,
    cancel: &CancellationToken,
    batch: &mut Vec<String>,
    summary: &mut FeedSummary,
) {
    let lines = std::mem::take(batch);

    match decode_lines(&lines) {
        Ok(records) => {
            let delivered = registry.write_to_all(cancel, &records).await;
            summary.batches += 1;
            summary.records += records.len();
            debug!(count = records.len(), pumps = delivered, "Batch flushed");
        }
        Err(e) => {
            summary.dropped_batches += 1;
            error!(error = %e, count = lines.len(), "Dropping batch with malformed record");
        }
    }
}
