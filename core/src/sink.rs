//! # Result Sink
//!
//! The single consumer of the result queue. Records are written one line each, in the
//! order they arrive, and flushed immediately so a crash loses at most the record in flight.

use std::io;
use std::path::Path;
use std::sync::Arc;

use relayscan_common::models::ServiceRecord;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::error::PipelineError;
use crate::queue::Consumer;
use crate::stats::PipelineStats;

const TAG: &str = "[sink]";

pub struct ResultSink<W> {
    writer: W,
    stats: Arc<PipelineStats>,
}

impl ResultSink<File> {
    /// Creates (or truncates) the output file.
    pub async fn create(path: &Path, stats: Arc<PipelineStats>) -> Result<Self, PipelineError> {
        let file: File = File::create(path)
            .await
            .map_err(|source| PipelineError::Output {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("{TAG} writing results to {}", path.display());
        Ok(Self::new(file, stats))
    }
}

impl<W> ResultSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, stats: Arc<PipelineStats>) -> Self {
        Self { writer, stats }
    }

    /// Drains `records` until the queue is closed. Hands the writer back when done.
    pub async fn run(mut self, records: Consumer<ServiceRecord>) -> W {
        while let Some(record) = records.pop().await {
            match self.write_record(&record).await {
                Ok(()) => {
                    PipelineStats::bump(&self.stats.records_written);
                    debug!("{TAG} wrote {record}");
                }
                Err(e) => {
                    PipelineStats::bump(&self.stats.write_failures);
                    error!("{TAG} failed to write '{record}': {e}");
                }
            }
        }

        if let Err(e) = self.writer.shutdown().await {
            warn!("{TAG} failed to close output: {e}");
        }

        let summary = self.stats.summary();
        info!(
            "{TAG} result queue drained: {} records written, {} failed",
            summary.records_written, summary.write_failures
        );
        self.writer
    }

    async fn write_record(&mut self, record: &ServiceRecord) -> io::Result<()> {
        let line: String = format!("{record}\n");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
