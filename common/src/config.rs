//! # Run Configuration
//!
//! A [`Config`] is assembled once at startup through [`ConfigBuilder`], validated, and then
//! shared read-only by every pipeline stage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::network::target;

pub const DEFAULT_RATE: u32 = 2_000;
pub const DEFAULT_SCRATCH_DIR: &str = "relayscan_tmp";
pub const DEFAULT_DISCOVERY_BIN: &str = "masscan";
pub const DEFAULT_FINGERPRINT_BIN: &str = "nmap";
pub const FALLBACK_OUTPUT: &str = "out.txt";

/// Where the targets of a run come from. Exactly one source is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    /// Comma-separated target expressions given on the command line.
    List(String),
    /// File with one target expression per line.
    File(PathBuf),
}

impl TargetSpec {
    /// Picks the single configured source. A blank list counts as unset.
    pub fn from_options(
        target: Option<String>,
        input: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let target = target.filter(|t| !t.trim().is_empty());

        match (target, input) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingTargets),
            (None, None) => Err(ConfigError::MissingTargets),
            (Some(list), None) => {
                if target::split_list(&list).next().is_none() {
                    return Err(ConfigError::EmptyTargetList);
                }
                Ok(TargetSpec::List(list))
            }
            (None, Some(path)) => Ok(TargetSpec::File(path)),
        }
    }

    /// Output file name derived from the target source.
    ///
    /// * one entry `E` gives `E_out.txt`
    /// * several entries, first `E`, give `E_etc_out.txt`
    /// * `dir/name.ext` gives `dir/name_out.ext`
    pub fn default_output(&self) -> PathBuf {
        match self {
            TargetSpec::List(list) => {
                let entries: Vec<&str> = target::split_list(list).collect();
                match entries.as_slice() {
                    [] => PathBuf::from(FALLBACK_OUTPUT),
                    [single] => PathBuf::from(format!("{}_out.txt", file_safe(single))),
                    [first, ..] => PathBuf::from(format!("{}_etc_out.txt", file_safe(first))),
                }
            }
            TargetSpec::File(path) => derive_from_input(path),
        }
    }
}

fn derive_from_input(path: &Path) -> PathBuf {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return PathBuf::from(FALLBACK_OUTPUT);
    };

    let file_name: String = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_out.{ext}"),
        None => format!("{stem}_out"),
    };

    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

fn file_safe(entry: &str) -> String {
    entry.replace(['/', '\\'], "_")
}

/// Locations of the external scanning engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub discovery: PathBuf,
    pub fingerprint: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            discovery: PathBuf::from(DEFAULT_DISCOVERY_BIN),
            fingerprint: PathBuf::from(DEFAULT_FINGERPRINT_BIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub targets: TargetSpec,
    pub discovery_workers: usize,
    pub fingerprint_workers: usize,
    /// Packets per second handed to the discovery engine.
    pub discovery_rate: u32,
    pub output: PathBuf,
    /// Directory holding the temporary artifacts of engine invocations.
    pub scratch_dir: PathBuf,
    /// Keeps artifacts on disk after they were parsed.
    pub retain_artifacts: bool,
    pub tools: ToolPaths,
    /// Wall-clock limit for a single engine invocation.
    pub tool_timeout: Option<Duration>,
}

impl Config {
    /// Starts a builder whose worker defaults are derived from `cpu_count`.
    pub fn builder(cpu_count: usize) -> ConfigBuilder {
        ConfigBuilder::new(cpu_count)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    cpu_count: usize,
    target: Option<String>,
    input: Option<PathBuf>,
    discovery_workers: Option<usize>,
    fingerprint_workers: Option<usize>,
    discovery_rate: u32,
    output: Option<PathBuf>,
    scratch_dir: PathBuf,
    retain_artifacts: bool,
    tools: ToolPaths,
    tool_timeout: Option<Duration>,
}

impl ConfigBuilder {
    fn new(cpu_count: usize) -> Self {
        Self {
            cpu_count: cpu_count.max(1),
            target: None,
            input: None,
            discovery_workers: None,
            fingerprint_workers: None,
            discovery_rate: DEFAULT_RATE,
            output: None,
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            retain_artifacts: false,
            tools: ToolPaths::default(),
            tool_timeout: None,
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn input(mut self, input: impl Into<PathBuf>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn discovery_workers(mut self, workers: usize) -> Self {
        self.discovery_workers = Some(workers);
        self
    }

    pub fn fingerprint_workers(mut self, workers: usize) -> Self {
        self.fingerprint_workers = Some(workers);
        self
    }

    pub fn discovery_rate(mut self, rate: u32) -> Self {
        self.discovery_rate = rate;
        self
    }

    pub fn output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn retain_artifacts(mut self, retain: bool) -> Self {
        self.retain_artifacts = retain;
        self
    }

    pub fn discovery_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.tools.discovery = bin.into();
        self
    }

    pub fn fingerprint_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.tools.fingerprint = bin.into();
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    /// Validates the collected options and freezes them into a [`Config`].
    pub fn build(self) -> Result<Config, ConfigError> {
        let targets = TargetSpec::from_options(self.target, self.input)?;

        let discovery_workers = self.discovery_workers.unwrap_or(self.cpu_count);
        if discovery_workers == 0 {
            return Err(ConfigError::ZeroWorkers { stage: "discovery" });
        }

        let fingerprint_workers = self.fingerprint_workers.unwrap_or(2 * self.cpu_count);
        if fingerprint_workers == 0 {
            return Err(ConfigError::ZeroWorkers {
                stage: "fingerprint",
            });
        }

        if self.discovery_rate == 0 {
            return Err(ConfigError::ZeroRate);
        }

        if self.tool_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.scratch_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyScratchDir);
        }

        let output = self.output.unwrap_or_else(|| targets.default_output());
        if output.is_dir() {
            return Err(ConfigError::OutputIsDirectory(output));
        }

        Ok(Config {
            targets,
            discovery_workers,
            fingerprint_workers,
            discovery_rate: self.discovery_rate,
            output,
            scratch_dir: self.scratch_dir,
            retain_artifacts: self.retain_artifacts,
            tools: self.tools,
            tool_timeout: self.tool_timeout,
        })
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
