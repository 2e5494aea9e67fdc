//! # Discovery Engine
//!
//! A pool of workers that turns [`ScanTarget`]s into [`FingerprintJob`]s.
//!
//! Each worker pops a target, runs the discovery engine against every port of it and reads
//! the list artifact back into [`PortRecord`]s. Every successfully scanned target yields
//! exactly one job, even when no port was found; failed targets yield nothing.
//!
//! The fingerprint queue is closed once, after every worker has drained the target queue.

use std::path::Path;
use std::sync::Arc;

use relayscan_common::config::Config;
use relayscan_common::models::{
    CorrelationToken, FingerprintJob, PortRecord, ScanTarget,
};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::parser::ArtifactParser;
use crate::parser::list::ListParser;
use crate::pool::PoolGauge;
use crate::queue::{Consumer, Producer};
use crate::runner::{self, Invocation, ToolError, ToolRunner};
use crate::stats::PipelineStats;

pub struct DiscoveryEngine {
    config: Arc<Config>,
    runner: Arc<dyn ToolRunner>,
    store: ArtifactStore,
    stats: Arc<PipelineStats>,
    gauge: Arc<PoolGauge>,
}

impl DiscoveryEngine {
    pub fn new(
        config: Arc<Config>,
        runner: Arc<dyn ToolRunner>,
        store: ArtifactStore,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let gauge = PoolGauge::new("discovery", config.discovery_workers);
        Self {
            config,
            runner,
            store,
            stats,
            gauge,
        }
    }

    pub fn gauge(&self) -> Arc<PoolGauge> {
        Arc::clone(&self.gauge)
    }

    /// Runs the worker pool until `targets` is closed and drained, then closes `jobs`.
    pub async fn run(self, targets: Consumer<ScanTarget>, jobs: Producer<FingerprintJob>) {
        let workers: usize = self.config.discovery_workers;
        let engine = Arc::new(self);

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| {
                let engine = Arc::clone(&engine);
                let targets = targets.clone();
                let jobs = jobs.clone();
                tokio::spawn(async move { engine.work(id, targets, jobs).await })
            })
            .collect();
        drop(targets);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("[discovery] worker terminated abnormally: {e}");
            }
        }

        jobs.close();

        let summary = engine.stats.summary();
        info!(
            "[discovery] {workers} workers stopped: {} targets scanned, {} failed",
            summary.discovery_ok, summary.discovery_failed
        );
    }

    async fn work(
        &self,
        id: usize,
        targets: Consumer<ScanTarget>,
        jobs: Producer<FingerprintJob>,
    ) {
        let tag: String = format!("[discovery-{id}]");
        let _guard = self.gauge.enter();
        debug!("{tag} started");

        while let Some(target) = targets.pop().await {
            let Some(job) = self.scan(&tag, target).await else {
                continue;
            };

            debug!(
                "{tag} queueing job {} for {} with ports [{}]",
                job.token,
                job.host,
                job.port_list()
            );
            if jobs.push(job).await.is_err() {
                warn!("{tag} fingerprint queue has no consumers, stopping");
                break;
            }
            PipelineStats::bump(&self.stats.discovery_ok);
            PipelineStats::bump(&self.stats.jobs_queued);
        }

        debug!("{tag} target queue drained, stopping");
    }

    /// Scans one target. `None` when the engine failed.
    async fn scan(&self, tag: &str, target: ScanTarget) -> Option<FingerprintJob> {
        let token = CorrelationToken::fresh();
        let artifact = self.store.path_for(ArtifactKind::Discovery, &token);
        let subject: String = target.to_string();

        let invocation = Invocation::new(&self.config.tools.discovery)
            .arg(&subject)
            .arg(format!("--rate={}", self.config.discovery_rate))
            .arg("-p-")
            .write_to("-oL", &artifact);
        debug!("{tag} running {}", invocation.command_line());

        let outcome: Result<Vec<PortRecord>, ToolError> = match self.runner.execute(&invocation).await {
            Ok(output) => {
                runner::report_output(tag, &subject, &output);
                self.read_ports(tag, target, &artifact).await
            }
            Err(e) => Err(e),
        };

        self.store.release(&artifact, tag).await;

        match outcome {
            Ok(ports) => {
                info!("{tag} {subject}: {} open ports", ports.len());
                Some(FingerprintJob::new(token, target.addr, ports))
            }
            Err(e) => {
                PipelineStats::bump(&self.stats.discovery_failed);
                runner::report_failure(tag, &subject, &artifact, &e);
                None
            }
        }
    }

    async fn read_ports(
        &self,
        tag: &str,
        target: ScanTarget,
        artifact: &Path,
    ) -> Result<Vec<PortRecord>, ToolError> {
        let mut lines = self.store.lines(artifact).await?;
        let mut ports: Vec<PortRecord> = Vec::new();
        let mut line_no: usize = 0;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|source| ToolError::Artifact {
                path: artifact.to_path_buf(),
                source,
            })?
        {
            line_no += 1;
            for result in ListParser.parse_line(&line) {
                match result {
                    Ok(record) if record.host == target.addr => ports.push(record),
                    Ok(record) => {
                        warn!(
                            "{tag} {}:{line_no}: dropping port {} of unexpected host {}",
                            artifact.display(),
                            record.port,
                            record.host
                        );
                    }
                    Err(e) => {
                        PipelineStats::bump(&self.stats.parse_errors);
                        warn!("{tag} {}:{line_no}: {e}", artifact.display());
                    }
                }
            }
        }

        Ok(ports)
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
