//! # Pipeline
//!
//! Wires the four stages together:
//!
//! ```text
//! TargetProducer -> [targets] -> DiscoveryEngine -> [jobs] -> FingerprintEngine -> [records] -> ResultSink
//! ```
//!
//! Shutdown is a cascade. The producer closes the target queue, each engine closes its
//! downstream queue once its workers are done, and the run ends when the sink has drained
//! the last record. Nothing is cancelled midway.

use std::sync::Arc;

use relayscan_common::config::Config;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::artifact::ArtifactStore;
use crate::discovery::DiscoveryEngine;
use crate::error::PipelineError;
use crate::fingerprint::FingerprintEngine;
use crate::pool::PoolGauge;
use crate::producer::TargetProducer;
use crate::queue;
use crate::runner::ToolRunner;
use crate::sink::ResultSink;
use crate::stats::{PipelineStats, RunSummary};

pub const TARGET_QUEUE_CAPACITY: usize = 64;
pub const JOB_QUEUE_CAPACITY: usize = 64;
pub const RESULT_QUEUE_CAPACITY: usize = 4;

/// Read-only view of a running pipeline, for progress displays.
#[derive(Debug, Clone)]
pub struct Monitor {
    pub stats: Arc<PipelineStats>,
    pub discovery: Arc<PoolGauge>,
    pub fingerprint: Arc<PoolGauge>,
}

pub struct Pipeline {
    config: Arc<Config>,
    store: ArtifactStore,
    stats: Arc<PipelineStats>,
    discovery: DiscoveryEngine,
    fingerprint: FingerprintEngine,
}

impl Pipeline {
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>) -> Self {
        let config = Arc::new(config);
        let store = ArtifactStore::new(&config.scratch_dir, config.retain_artifacts);
        let stats = Arc::new(PipelineStats::default());

        let discovery = DiscoveryEngine::new(
            Arc::clone(&config),
            Arc::clone(&runner),
            store.clone(),
            Arc::clone(&stats),
        );
        let fingerprint = FingerprintEngine::new(
            Arc::clone(&config),
            runner,
            store.clone(),
            Arc::clone(&stats),
        );

        Self {
            config,
            store,
            stats,
            discovery,
            fingerprint,
        }
    }

    pub fn monitor(&self) -> Monitor {
        Monitor {
            stats: Arc::clone(&self.stats),
            discovery: self.discovery.gauge(),
            fingerprint: self.fingerprint.gauge(),
        }
    }

    /// Runs every stage to completion.
    ///
    /// The scratch directory and the output file are set up before any stage starts;
    /// failing either aborts the run right away. An unreadable address file is only
    /// reported after the rest of the pipeline has drained.
    pub async fn run(self) -> Result<RunSummary, PipelineError> {
        self.store
            .prepare()
            .await
            .map_err(|source| PipelineError::Scratch {
                path: self.store.dir().to_path_buf(),
                source,
            })?;

        let sink = ResultSink::create(&self.config.output, Arc::clone(&self.stats)).await?;

        let (target_tx, target_rx) = queue::bounded(TARGET_QUEUE_CAPACITY);
        let (job_tx, job_rx) = queue::bounded(JOB_QUEUE_CAPACITY);
        let (record_tx, record_rx) = queue::bounded(RESULT_QUEUE_CAPACITY);

        info!(
            "starting pipeline: {} discovery workers, {} fingerprint workers, output {}",
            self.config.discovery_workers,
            self.config.fingerprint_workers,
            self.config.output.display()
        );

        let sink_handle: JoinHandle<_> = tokio::spawn(sink.run(record_rx));
        let fingerprint_handle: JoinHandle<()> =
            tokio::spawn(self.fingerprint.run(job_rx, record_tx));
        let discovery_handle: JoinHandle<()> =
            tokio::spawn(self.discovery.run(target_rx, job_tx));
        let producer = TargetProducer::new(self.config.targets.clone(), Arc::clone(&self.stats));
        let producer_handle: JoinHandle<Result<u64, PipelineError>> =
            tokio::spawn(producer.run(target_tx));

        let produced: Result<u64, PipelineError> = match producer_handle.await {
            Ok(result) => result,
            Err(e) => {
                error!("[producer] terminated abnormally: {e}");
                Err(PipelineError::StageAborted { stage: "producer" })
            }
        };
        let discovered = join_stage("discovery", discovery_handle).await;
        let fingerprinted = join_stage("fingerprint", fingerprint_handle).await;
        let drained = join_stage("sink", sink_handle).await;
        debug!("all stages joined");

        produced?;
        discovered?;
        fingerprinted?;
        drained?;

        Ok(self.stats.summary())
    }
}

async fn join_stage<T>(stage: &'static str, handle: JoinHandle<T>) -> Result<(), PipelineError> {
    handle.await.map(|_| ()).map_err(|e| {
        error!("[{stage}] terminated abnormally: {e}");
        PipelineError::StageAborted { stage }
    })
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
