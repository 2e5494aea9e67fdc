use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use colored::*;
use relayscan_common::config::{Config, TargetSpec};
use relayscan_common::network::target::{self, TargetExpr};
use relayscan_core::pipeline::Pipeline;
use relayscan_core::runner::ProcessRunner;
use tracing::{debug, warn};

use crate::commands::ScanArgs;
use crate::terminal::{print, spinner};

pub async fn scan(args: ScanArgs, quiet: bool) -> anyhow::Result<()> {
    let config: Config = args
        .into_config(cpu_count())
        .context("invalid scan options")?;
    debug!("resolved configuration: {config:?}");

    if !quiet {
        print_plan(&config);
    }

    let output = config.output.clone();
    let runner = Arc::new(ProcessRunner::new(config.tool_timeout));
    let pipeline = Pipeline::new(config, runner);

    let progress = (!quiet).then(|| spinner::start(pipeline.monitor()));
    let started: Instant = Instant::now();

    let result = pipeline.run().await;

    if let Some(progress) = progress {
        progress.finish();
    }

    let summary = result.context("scan did not complete")?;

    if !quiet {
        print::header("scan summary", quiet);
        print::run_summary(&summary, &output, started.elapsed());
        if summary.records_written == 0 {
            print::no_results();
        }
        print::end_of_program();
    }

    Ok(())
}

fn print_plan(config: &Config) {
    print::header("scan plan", false);

    let targets: ColoredString = match &config.targets {
        TargetSpec::List(list) => {
            let addresses: u64 = target::split_list(list)
                .filter_map(|entry| entry.parse::<TargetExpr>().ok())
                .map(|expr| expr.size())
                .sum();
            format!("{list} ({addresses} addresses)").normal()
        }
        TargetSpec::File(path) => format!("file {}", path.display()).normal(),
    };
    print::aligned_line("Targets", targets);
    print::aligned_line(
        "Workers",
        format!(
            "{} discovery, {} fingerprint",
            config.discovery_workers, config.fingerprint_workers
        ),
    );
    print::aligned_line("Rate", format!("{} pps", config.discovery_rate));
    print::aligned_line("Output", config.output.display().to_string());
    print::aligned_line("Scratch", config.scratch_dir.display().to_string());
    if config.retain_artifacts {
        print::aligned_line("Artifacts", "kept".yellow());
    }
    if let Some(timeout) = config.tool_timeout {
        print::aligned_line("Timeout", format!("{}s per invocation", timeout.as_secs()));
    }
}

fn cpu_count() -> usize {
    match sys_info::cpu_num() {
        Ok(count) => count.max(1) as usize,
        Err(e) => {
            warn!("could not determine CPU count, assuming 1: {e}");
            1
        }
    }
}
