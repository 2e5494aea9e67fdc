use std::path::Path;
use std::time::Duration;

use colored::*;
use relayscan_core::runner::{Invocation, ProcessRunner, ToolRunner};
use tracing::{error, info};

use crate::commands::EngineArgs;
use crate::terminal::print;

const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs each engine with `--version`. Fails if either cannot be run.
pub async fn check(args: EngineArgs, quiet: bool) -> anyhow::Result<()> {
    let runner = ProcessRunner::new(Some(CHECK_TIMEOUT));

    let discovery = probe(&runner, "discovery", &args.discovery_bin).await;
    let fingerprint = probe(&runner, "fingerprint", &args.fingerprint_bin).await;

    if !quiet {
        print::aligned_line("Discovery", status(&args.discovery_bin, &discovery));
        print::aligned_line("Fingerprint", status(&args.fingerprint_bin, &fingerprint));
        print::end_of_program();
    }

    if discovery.is_none() || fingerprint.is_none() {
        anyhow::bail!("at least one scanning engine is not usable");
    }
    Ok(())
}

/// First line of the version banner, or `None` when the engine could not be run.
async fn probe(runner: &ProcessRunner, role: &str, bin: &Path) -> Option<String> {
    let invocation = Invocation::new(bin).arg("--version");

    match runner.execute(&invocation).await {
        Ok(output) => {
            let version: String = output
                .stdout
                .lines()
                .chain(output.stderr.lines())
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or("unknown version")
                .to_string();
            info!("{role} engine {}: {version}", bin.display());
            Some(version)
        }
        Err(e) => {
            error!("{role} engine {}: {e}", bin.display());
            None
        }
    }
}

fn status(bin: &Path, version: &Option<String>) -> ColoredString {
    match version {
        Some(version) => format!("{} ({version})", bin.display()).green(),
        None => format!("{} (unusable)", bin.display()).red().bold(),
    }
}
