//! Lifecycle accounting for a fixed-size pool of workers.
//!
//! Counters only feed logs and the terminal spinner; no stage makes control decisions
//! based on them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use relayscan_common::models::EngineStatus;

/// Counts of workers in each lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolSnapshot {
    pub init: usize,
    pub running: usize,
    pub stopped: usize,
}

impl PoolSnapshot {
    /// Aggregate state of the whole pool.
    pub fn status(&self) -> EngineStatus {
        if self.init + self.running == 0 && self.stopped > 0 {
            EngineStatus::Stopped
        } else if self.running > 0 || self.stopped > 0 {
            EngineStatus::Running
        } else {
            EngineStatus::Init
        }
    }
}

#[derive(Debug)]
pub struct PoolGauge {
    name: &'static str,
    size: usize,
    running: AtomicUsize,
    stopped: AtomicUsize,
}

impl PoolGauge {
    pub fn new(name: &'static str, size: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            size,
            running: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Marks one worker as running until the returned guard drops.
    pub fn enter(self: &Arc<Self>) -> WorkerGuard {
        self.running.fetch_add(1, Ordering::Relaxed);
        WorkerGuard {
            gauge: Arc::clone(self),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let running = self.running.load(Ordering::Relaxed);
        let stopped = self.stopped.load(Ordering::Relaxed);
        PoolSnapshot {
            init: self.size.saturating_sub(running + stopped),
            running,
            stopped,
        }
    }
}

/// Flips its worker from running to stopped on drop, panics included.
#[derive(Debug)]
pub struct WorkerGuard {
    gauge: Arc<PoolGauge>,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.gauge.running.fetch_sub(1, Ordering::Relaxed);
        self.gauge.stopped.fetch_add(1, Ordering::Relaxed);
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
