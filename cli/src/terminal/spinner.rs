use std::io::{self, Write};
use std::sync::OnceLock;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use relayscan_core::pipeline::Monitor;
use relayscan_core::pool::PoolGauge;

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

static SPINNER: OnceLock<ProgressBar> = OnceLock::new();

/// Live progress line shown while a pipeline runs.
pub struct SpinnerHandle {
    spinner: ProgressBar,
    stop: Sender<()>,
    updater: JoinHandle<()>,
}

impl SpinnerHandle {
    pub fn finish(self) {
        let _ = self.stop.send(());
        let _ = self.updater.join();
        self.spinner.finish_and_clear();
    }
}

pub fn start(monitor: Monitor) -> SpinnerHandle {
    let spinner: ProgressBar = SPINNER.get_or_init(init_spinner).clone();
    spinner.enable_steady_tick(Duration::from_millis(100));

    let (stop, rx) = mpsc::channel::<()>();
    let pb_clone = spinner.clone();

    let updater = thread::spawn(move || {
        loop {
            pb_clone.set_message(progress_message(&monitor));
            match rx.recv_timeout(REFRESH_INTERVAL) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    SpinnerHandle {
        spinner,
        stop,
        updater,
    }
}

fn init_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);
    pb.set_style(style);
    pb
}

fn progress_message(monitor: &Monitor) -> String {
    let stats = monitor.stats.summary();
    format!(
        "{} targets {} {} jobs {} {} records {} {} {}",
        stats.targets_queued.to_string().green().bold(),
        "·".bright_black(),
        stats.jobs_queued.to_string().green().bold(),
        "·".bright_black(),
        stats.records_written.to_string().green().bold(),
        "│".bright_black(),
        pool_state(&monitor.discovery),
        pool_state(&monitor.fingerprint),
    )
}

fn pool_state(gauge: &PoolGauge) -> String {
    let snapshot = gauge.snapshot();
    format!(
        "{} {}/{}",
        gauge.name().italic(),
        snapshot.running,
        gauge.size()
    )
}

/// Log writer that keeps the spinner line intact.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match SPINNER.get() {
            Some(spinner) if !spinner.is_finished() && !spinner.is_hidden() => {
                let msg = String::from_utf8_lossy(buf);
                spinner.println(msg.trim_end());
                Ok(buf.len())
            }
            _ => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
