//! # Fingerprint Engine
//!
//! A pool of workers that turns [`FingerprintJob`]s into [`ServiceRecord`]s.
//!
//! Empty jobs are discarded without touching the engine. For every other job the engine is
//! pointed at exactly the ports discovery reported, and each open port it identifies is
//! pushed to the result queue as soon as its artifact line has been parsed.

use std::sync::Arc;

use relayscan_common::config::Config;
use relayscan_common::models::{FingerprintJob, ServiceRecord};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::artifact::{ArtifactKind, ArtifactStore};
use crate::parser::ArtifactParser;
use crate::parser::grepable::GrepableParser;
use crate::pool::PoolGauge;
use crate::queue::{Consumer, Producer};
use crate::runner::{self, Invocation, ToolError, ToolRunner};
use crate::stats::PipelineStats;

pub struct FingerprintEngine {
    config: Arc<Config>,
    runner: Arc<dyn ToolRunner>,
    store: ArtifactStore,
    stats: Arc<PipelineStats>,
    gauge: Arc<PoolGauge>,
}

/// The result queue lost all of its consumers.
struct SinkGone;

impl FingerprintEngine {
    pub fn new(
        config: Arc<Config>,
        runner: Arc<dyn ToolRunner>,
        store: ArtifactStore,
        stats: Arc<PipelineStats>,
    ) -> Self {
        let gauge = PoolGauge::new("fingerprint", config.fingerprint_workers);
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

    /// Runs the worker pool until `jobs` is closed and drained, then closes `results`.
    pub async fn run(self, jobs: Consumer<FingerprintJob>, results: Producer<ServiceRecord>) {
        let workers: usize = self.config.fingerprint_workers;
        let engine = Arc::new(self);

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| {
                let engine = Arc::clone(&engine);
                let jobs = jobs.clone();
                let results = results.clone();
                tokio::spawn(async move { engine.work(id, jobs, results).await })
            })
            .collect();
        drop(jobs);

        for handle in handles {
            if let Err(e) = handle.await {
                error!("[fingerprint] worker terminated abnormally: {e}");
            }
        }

        results.close();

        let summary = engine.stats.summary();
        info!(
            "[fingerprint] {workers} workers stopped: {} jobs fingerprinted, {} failed, {} skipped as empty",
            summary.fingerprint_ok, summary.fingerprint_failed, summary.empty_jobs
        );
    }

    async fn work(
        &self,
        id: usize,
        jobs: Consumer<FingerprintJob>,
        results: Producer<ServiceRecord>,
    ) {
        let tag: String = format!("[fingerprint-{id}]");
        let _guard = self.gauge.enter();
        debug!("{tag} started");

        while let Some(job) = jobs.pop().await {
            if job.is_empty() {
                debug!("{tag} {}: no open ports, nothing to fingerprint", job.host);
                PipelineStats::bump(&self.stats.empty_jobs);
                continue;
            }

            if let Err(SinkGone) = self.fingerprint(&tag, &job, &results).await {
                warn!("{tag} result queue has no consumers, stopping");
                break;
            }
        }

        debug!("{tag} job queue drained, stopping");
    }

    async fn fingerprint(
        &self,
        tag: &str,
        job: &FingerprintJob,
        results: &Producer<ServiceRecord>,
    ) -> Result<(), SinkGone> {
        let artifact = self.store.path_for(ArtifactKind::Fingerprint, &job.token);
        let subject: String = job.host.to_string();

        let invocation = Invocation::new(&self.config.tools.fingerprint)
            .arg(&subject)
            .arg("-T5")
            .arg("-sV")
            .arg("-p")
            .arg(job.port_list())
            .write_to("-oG", &artifact);
        debug!("{tag} running {}", invocation.command_line());

        let outcome: Result<Result<usize, SinkGone>, ToolError> =
            match self.runner.execute(&invocation).await {
                Ok(output) => {
                    runner::report_output(tag, &subject, &output);
                    self.stream_records(tag, job, &artifact, results).await
                }
                Err(e) => Err(e),
            };

        self.store.release(&artifact, tag).await;

        match outcome {
            Ok(Ok(emitted)) => {
                PipelineStats::bump(&self.stats.fingerprint_ok);
                info!(
                    "{tag} {subject}: {emitted} services identified on {} ports",
                    job.ports.len()
                );
                Ok(())
            }
            Ok(Err(SinkGone)) => Err(SinkGone),
            Err(e) => {
                PipelineStats::bump(&self.stats.fingerprint_failed);
                runner::report_failure(tag, &subject, &artifact, &e);
                Ok(())
            }
        }
    }

    /// Parses the artifact and pushes every record of the job's host as it is read.
    async fn stream_records(
        &self,
        tag: &str,
        job: &FingerprintJob,
        artifact: &std::path::Path,
        results: &Producer<ServiceRecord>,
    ) -> Result<Result<usize, SinkGone>, ToolError> {
        let mut lines = self.store.lines(artifact).await?;
        let mut emitted: usize = 0;
        let mut line_no: usize = 0;

        loop {
            let line: String = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(source) => {
                    // Records already pushed stay valid.
                    return Err(ToolError::Artifact {
                        path: artifact.to_path_buf(),
                        source,
                    });
                }
            };
            line_no += 1;

            for result in GrepableParser.parse_line(&line) {
                match result {
                    Ok(record) if record.host == job.host => {
                        debug!("{tag} record: {record}");
                        if results.push(record).await.is_err() {
                            return Ok(Err(SinkGone));
                        }
                        emitted += 1;
                        PipelineStats::bump(&self.stats.records_emitted);
                    }
                    Ok(record) => {
                        warn!(
                            "{tag} {}:{line_no}: dropping record of unexpected host {}",
                            artifact.display(),
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

        Ok(Ok(emitted))
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
