use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by every stage of a run.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub targets_queued: AtomicU64,
    pub targets_rejected: AtomicU64,
    pub discovery_ok: AtomicU64,
    pub discovery_failed: AtomicU64,
    pub jobs_queued: AtomicU64,
    pub empty_jobs: AtomicU64,
    pub fingerprint_ok: AtomicU64,
    pub fingerprint_failed: AtomicU64,
    pub parse_errors: AtomicU64,
    pub records_emitted: AtomicU64,
    pub records_written: AtomicU64,
    pub write_failures: AtomicU64,
}

impl PipelineStats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> RunSummary {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        RunSummary {
            targets_queued: load(&self.targets_queued),
            targets_rejected: load(&self.targets_rejected),
            discovery_ok: load(&self.discovery_ok),
            discovery_failed: load(&self.discovery_failed),
            jobs_queued: load(&self.jobs_queued),
            empty_jobs: load(&self.empty_jobs),
            fingerprint_ok: load(&self.fingerprint_ok),
            fingerprint_failed: load(&self.fingerprint_failed),
            parse_errors: load(&self.parse_errors),
            records_emitted: load(&self.records_emitted),
            records_written: load(&self.records_written),
            write_failures: load(&self.write_failures),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub targets_queued: u64,
    pub targets_rejected: u64,
    pub discovery_ok: u64,
    pub discovery_failed: u64,
    pub jobs_queued: u64,
    pub empty_jobs: u64,
    pub fingerprint_ok: u64,
    pub fingerprint_failed: u64,
    pub parse_errors: u64,
    pub records_emitted: u64,
    pub records_written: u64,
    pub write_failures: u64,
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
    use std::sync::Arc;

    #[test]
    fn summary_reflects_bumps_from_many_threads() {
        let stats = Arc::new(PipelineStats::default());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        PipelineStats::bump(&stats.records_written);
                    }
                    PipelineStats::bump(&stats.write_failures);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = stats.summary();
        assert_eq!(summary.records_written, 1000);
        assert_eq!(summary.write_failures, 4);
        assert_eq!(summary.targets_queued, 0);
    }
}
