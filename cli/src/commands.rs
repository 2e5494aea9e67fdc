pub mod check;
pub mod scan;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use relayscan_common::config::{
    Config, DEFAULT_DISCOVERY_BIN, DEFAULT_FINGERPRINT_BIN, DEFAULT_RATE, DEFAULT_SCRATCH_DIR,
};
use relayscan_common::error::ConfigError;

#[derive(Parser)]
#[command(name = "relayscan", version)]
#[command(about = "Finds open ports with a fast discovery engine, then fingerprints their services.")]
pub struct CommandLine {
    /// Log debug messages, including every engine command line
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Also write plain log lines to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// No banner, spinner or summary; log lines only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover open ports and fingerprint the services behind them
    #[command(alias = "s")]
    Scan(ScanArgs),
    /// Check that both scanning engines can be started
    #[command(alias = "c")]
    Check(EngineArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Discovery engine binary (masscan compatible)
    #[arg(long, value_name = "BIN", default_value = DEFAULT_DISCOVERY_BIN)]
    pub discovery_bin: PathBuf,

    /// Fingerprint engine binary (nmap compatible)
    #[arg(long, value_name = "BIN", default_value = DEFAULT_FINGERPRINT_BIN)]
    pub fingerprint_bin: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Comma-separated targets: addresses, ranges (10.0.0.1-20) or CIDR blocks
    #[arg(short, long, value_name = "TARGETS")]
    pub target: Option<String>,

    /// File with one target per line
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Discovery workers [default: CPU count]
    #[arg(short = 'm', long, value_name = "N")]
    pub discovery_workers: Option<usize>,

    /// Fingerprint workers [default: 2 x CPU count]
    #[arg(short = 'n', long, value_name = "N")]
    pub fingerprint_workers: Option<usize>,

    /// Discovery packet rate
    #[arg(short, long, value_name = "PPS", default_value_t = DEFAULT_RATE)]
    pub rate: u32,

    /// Output file [default: derived from the targets]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory for engine artifacts
    #[arg(long, value_name = "DIR", default_value = DEFAULT_SCRATCH_DIR)]
    pub scratch_dir: PathBuf,

    /// Keep engine artifacts after parsing them
    #[arg(long)]
    pub keep_artifacts: bool,

    /// Kill an engine invocation after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub tool_timeout: Option<u64>,

    #[command(flatten)]
    pub engines: EngineArgs,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl ScanArgs {
    /// Resolves defaults against `cpu_count` and validates the result.
    pub fn into_config(self, cpu_count: usize) -> Result<Config, ConfigError> {
        let mut builder = Config::builder(cpu_count)
            .discovery_rate(self.rate)
            .scratch_dir(self.scratch_dir)
            .retain_artifacts(self.keep_artifacts)
            .discovery_bin(self.engines.discovery_bin)
            .fingerprint_bin(self.engines.fingerprint_bin);

        if let Some(target) = self.target {
            builder = builder.target(target);
        }
        if let Some(input) = self.input {
            builder = builder.input(input);
        }
        if let Some(workers) = self.discovery_workers {
            builder = builder.discovery_workers(workers);
        }
        if let Some(workers) = self.fingerprint_workers {
            builder = builder.fingerprint_workers(workers);
        }
        if let Some(output) = self.output {
            builder = builder.output(output);
        }
        if let Some(seconds) = self.tool_timeout {
            builder = builder.tool_timeout(Duration::from_secs(seconds));
        }

        builder.build()
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
