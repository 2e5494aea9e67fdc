//! # Target Producer
//!
//! Expands the configured target source into [`ScanTarget`]s and feeds the discovery queue.
//! Closing that queue is the only shutdown signal the discovery engine receives, so the
//! producer closes it on every path, errors included.

use std::path::Path;
use std::sync::Arc;

use relayscan_common::config::TargetSpec;
use relayscan_common::models::ScanTarget;
use relayscan_common::network::target::{self, TargetExpr};
use tokio::fs::File;
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::lines::LossyLines;
use crate::queue::Producer;
use crate::stats::PipelineStats;

const TAG: &str = "[producer]";

pub struct TargetProducer {
    spec: TargetSpec,
    stats: Arc<PipelineStats>,
}

/// Whether the producer should keep going after an entry.
enum Flow {
    Continue,
    Stop,
}

impl TargetProducer {
    pub fn new(spec: TargetSpec, stats: Arc<PipelineStats>) -> Self {
        Self { spec, stats }
    }

    /// Pushes every valid target, then closes `queue`. Returns the number of targets queued.
    pub async fn run(self, queue: Producer<ScanTarget>) -> Result<u64, PipelineError> {
        let result = match &self.spec {
            TargetSpec::List(list) => {
                self.feed_list(list, &queue).await;
                Ok(())
            }
            TargetSpec::File(path) => self.feed_file(path, &queue).await,
        };

        queue.close();

        let queued: u64 = self.stats.summary().targets_queued;
        let rejected: u64 = self.stats.summary().targets_rejected;
        info!("{TAG} queued {queued} targets, rejected {rejected} entries");

        result.map(|()| queued)
    }

    async fn feed_list(&self, list: &str, queue: &Producer<ScanTarget>) {
        for entry in target::split_list(list) {
            let flow = match entry.parse::<TargetExpr>() {
                Ok(expr) => self.push_all(&expr, queue).await,
                Err(e) => {
                    warn!("{TAG} skipping target '{entry}': {e}");
                    PipelineStats::bump(&self.stats.targets_rejected);
                    Flow::Continue
                }
            };
            if let Flow::Stop = flow {
                return;
            }
        }
    }

    async fn feed_file(
        &self,
        path: &Path,
        queue: &Producer<ScanTarget>,
    ) -> Result<(), PipelineError> {
        let input_error = |source| PipelineError::Input {
            path: path.to_path_buf(),
            source,
        };

        let file: File = File::open(path).await.map_err(input_error)?;
        let mut lines = LossyLines::new(BufReader::new(file));
        let mut line_no: usize = 0;

        while let Some(line) = lines.next_line().await.map_err(input_error)? {
            line_no += 1;

            let flow = match target::parse_line(&line) {
                None => Flow::Continue,
                Some(Ok(expr)) => self.push_all(&expr, queue).await,
                Some(Err(e)) => {
                    warn!("{TAG} {}:{line_no}: skipping entry: {e}", path.display());
                    PipelineStats::bump(&self.stats.targets_rejected);
                    Flow::Continue
                }
            };
            if let Flow::Stop = flow {
                break;
            }
        }

        Ok(())
    }

    async fn push_all(&self, expr: &TargetExpr, queue: &Producer<ScanTarget>) -> Flow {
        for scan_target in expr.targets() {
            debug!("{TAG} queueing {scan_target}");
            if queue.push(scan_target).await.is_err() {
                warn!("{TAG} discovery queue has no consumers, stopping");
                return Flow::Stop;
            }
            PipelineStats::bump(&self.stats.targets_queued);
        }
        Flow::Continue
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{self, Consumer};
    use std::io::Write;

    async fn drain(consumer: Consumer<ScanTarget>) -> Vec<String> {
        let mut seen = Vec::new();
        while let Some(target) = consumer.pop().await {
            seen.push(target.to_string());
        }
        seen
    }

    #[tokio::test]
    async fn list_entries_expand_in_order() {
        let stats = Arc::new(PipelineStats::default());
        let (tx, rx) = queue::bounded(64);
        let producer = TargetProducer::new(
            TargetSpec::List("10.0.0.9, 10.0.0.1-3,,bogus, 192.168.0.0/31".to_string()),
            Arc::clone(&stats),
        );

        let queued = producer.run(tx).await.unwrap();

        assert_eq!(queued, 6);
        assert_eq!(
            drain(rx).await,
            vec![
                "10.0.0.9",
                "10.0.0.1",
                "10.0.0.2",
                "10.0.0.3",
                "192.168.0.0",
                "192.168.0.1"
            ]
        );
        assert_eq!(stats.summary().targets_rejected, 1);
    }

    #[tokio::test]
    async fn address_file_skips_comments_and_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# lab hosts").unwrap();
        writeln!(file, "10.0.0.5").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  10.0.0.7  ").unwrap();
        writeln!(file, "10.0.0.300").unwrap();
        writeln!(file, "10.0.0.20-10.0.0.10").unwrap();
        writeln!(file, "::1").unwrap();

        let stats = Arc::new(PipelineStats::default());
        let (tx, rx) = queue::bounded(64);
        let producer = TargetProducer::new(
            TargetSpec::File(file.path().to_path_buf()),
            Arc::clone(&stats),
        );

        assert_eq!(producer.run(tx).await.unwrap(), 3);
        assert_eq!(drain(rx).await, vec!["10.0.0.5", "10.0.0.7", "::1"]);
        assert_eq!(stats.summary().targets_rejected, 2);
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped_like_any_bad_entry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"10.0.0.1\n\xff\xfe garbage\n10.0.0.2\n10.0.0.3\n")
            .unwrap();

        let stats = Arc::new(PipelineStats::default());
        let (tx, rx) = queue::bounded(64);
        let producer = TargetProducer::new(
            TargetSpec::File(file.path().to_path_buf()),
            Arc::clone(&stats),
        );

        assert_eq!(producer.run(tx).await.unwrap(), 3);
        assert_eq!(drain(rx).await, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(stats.summary().targets_rejected, 1);
    }

    #[tokio::test]
    async fn unreadable_file_still_closes_queue() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");

        let (tx, rx) = queue::bounded(4);
        let producer = TargetProducer::new(
            TargetSpec::File(missing.clone()),
            Arc::new(PipelineStats::default()),
        );

        let err = producer.run(tx).await.unwrap_err();
        assert!(matches!(err, PipelineError::Input { path, .. } if path == missing));
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn stops_when_discovery_is_gone() {
        let (tx, rx) = queue::bounded(1);
        drop(rx);

        let stats = Arc::new(PipelineStats::default());
        let producer = TargetProducer::new(
            TargetSpec::List("10.0.0.0/24".to_string()),
            Arc::clone(&stats),
        );

        assert_eq!(producer.run(tx).await.unwrap(), 0);
    }
}
