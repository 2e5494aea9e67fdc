#![cfg(test)]
use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use relayscan_common::config::Config;
use relayscan_common::models::EngineStatus;
use relayscan_core::error::PipelineError;
use relayscan_core::pipeline::Pipeline;
use relayscan_core::runner::ToolRunner;
use relayscan_core::stats::RunSummary;
use tempfile::TempDir;

use crate::engines::{FakeEngines, Reply};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("results.txt")
    }

    fn scratch(&self) -> PathBuf {
        self.dir.path().join("scratch")
    }

    fn config(&self, target: &str, discovery: usize, fingerprint: usize) -> Config {
        Config::builder(2)
            .target(target)
            .discovery_workers(discovery)
            .fingerprint_workers(fingerprint)
            .output(self.output())
            .scratch_dir(self.scratch())
            .build()
            .unwrap()
    }

    fn lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.output())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn artifacts(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.scratch())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

async fn run(config: Config, engines: &Arc<FakeEngines>) -> Result<RunSummary, PipelineError> {
    let runner: Arc<dyn ToolRunner> = Arc::clone(engines) as Arc<dyn ToolRunner>;
    Pipeline::new(config, runner).run().await
}

/*************************************************************
                     Whole pipeline runs
**************************************************************/

#[tokio::test]
async fn two_targets_one_service() {
    let ws = Workspace::new();
    let engines = Arc::new(
        FakeEngines::new()
            .open_ports("1.2.3.4", &[80])
            .services("1.2.3.4", &[(80, "http", "nginx")]),
    );

    let summary = run(ws.config("1.2.3.4,1.2.3.5", 2, 4), &engines).await.unwrap();

    assert_eq!(ws.lines(), vec!["1.2.3.4, tcp, 80, http, nginx"]);
    assert_eq!(summary.targets_queued, 2);
    assert_eq!(summary.jobs_queued, 2);
    assert_eq!(summary.empty_jobs, 1);
    assert_eq!(summary.records_written, 1);

    // The empty job for 1.2.3.5 never reaches the fingerprint engine.
    let fingerprint_calls = engines.calls_to("nmap");
    assert_eq!(fingerprint_calls.len(), 1);
    assert_eq!(fingerprint_calls[0].args[0].to_string_lossy(), "1.2.3.4");
    assert_eq!(engines.calls_to("masscan").len(), 2);
    assert!(ws.artifacts().is_empty());
}

#[tokio::test]
async fn many_workers_never_duplicate_records() {
    let ws = Workspace::new();
    let mut engines = FakeEngines::new().with_delay(Duration::from_millis(2));
    let mut expected: HashSet<String> = HashSet::new();

    for i in 0..64u8 {
        let host = format!("10.20.0.{i}");
        engines = engines
            .open_ports(&host, &[22, 8080])
            .services(
                &host,
                &[(22, "ssh", "OpenSSH 9.6"), (8080, "http-proxy", "")],
            );
        expected.insert(format!("{host}, tcp, 22, ssh, OpenSSH 9.6"));
        expected.insert(format!("{host}, tcp, 8080, http-proxy, "));
    }
    let engines = Arc::new(engines);

    let summary = run(ws.config("10.20.0.0/26", 8, 16), &engines).await.unwrap();

    let lines = ws.lines();
    let written: HashSet<String> = lines.iter().cloned().collect();
    assert_eq!(lines.len(), 128);
    assert_eq!(written, expected);
    assert_eq!(summary.records_written, 128);
    assert!(engines.peak_concurrency() > 1);
}

#[tokio::test]
async fn address_file_with_noise() {
    let ws = Workspace::new();
    let input = ws.dir.path().join("hosts.txt");
    let mut file = std::fs::File::create(&input).unwrap();
    writeln!(file, "# office").unwrap();
    writeln!(file, "192.168.7.10").unwrap();
    writeln!(file, "not-an-address").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "192.168.7.11-12").unwrap();
    drop(file);

    let engines = Arc::new(
        FakeEngines::new()
            .open_ports("192.168.7.10", &[443])
            .services("192.168.7.10", &[(443, "https", "Caddy")])
            .open_ports("192.168.7.12", &[53])
            .services("192.168.7.12", &[(53, "domain", "dnsmasq 2.90")]),
    );

    let config = Config::builder(1)
        .input(&input)
        .output(ws.output())
        .scratch_dir(ws.scratch())
        .build()
        .unwrap();
    let summary = run(config, &engines).await.unwrap();

    let mut lines = ws.lines();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "192.168.7.10, tcp, 443, https, Caddy",
            "192.168.7.12, tcp, 53, domain, dnsmasq 2.90",
        ]
    );
    assert_eq!(summary.targets_queued, 3);
    assert_eq!(summary.targets_rejected, 1);
}

/*************************************************************
                      Failure handling
**************************************************************/

#[tokio::test]
async fn engine_failures_only_drop_their_item() {
    let ws = Workspace::new();
    let engines = Arc::new(
        FakeEngines::new()
            .discovery_reply("10.0.0.1", Reply::Fails)
            .open_ports("10.0.0.2", &[80])
            .fingerprint_reply("10.0.0.2", Reply::Fails)
            .open_ports("10.0.0.3", &[25])
            .services("10.0.0.3", &[(25, "smtp", "Postfix smtpd")]),
    );

    let summary = run(ws.config("10.0.0.1-3", 1, 1), &engines).await.unwrap();

    assert_eq!(ws.lines(), vec!["10.0.0.3, tcp, 25, smtp, Postfix smtpd"]);
    assert_eq!(summary.discovery_failed, 1);
    assert_eq!(summary.jobs_queued, 2);
    assert_eq!(summary.fingerprint_failed, 1);
    assert_eq!(summary.fingerprint_ok, 1);
    assert!(ws.artifacts().is_empty());
}

#[tokio::test]
async fn unopenable_output_stops_before_any_scan() {
    let ws = Workspace::new();
    let engines = Arc::new(FakeEngines::new().open_ports("1.2.3.4", &[80]));
    let config = Config::builder(1)
        .target("1.2.3.4")
        .output(ws.dir.path().join("missing-dir").join("out.txt"))
        .scratch_dir(ws.scratch())
        .build()
        .unwrap();

    let err = run(config, &engines).await.unwrap_err();

    assert!(matches!(err, PipelineError::Output { .. }));
    assert!(engines.calls_to("masscan").is_empty());
}

#[tokio::test]
async fn unreadable_input_fails_after_cascade() {
    let ws = Workspace::new();
    let engines = Arc::new(FakeEngines::new());
    let config = Config::builder(1)
        .input(ws.dir.path().join("absent.txt"))
        .output(ws.output())
        .scratch_dir(ws.scratch())
        .build()
        .unwrap();

    let err = run(config, &engines).await.unwrap_err();

    assert!(matches!(err, PipelineError::Input { ref path, .. } if path.ends_with("absent.txt")));
    assert!(ws.lines().is_empty());
}

/*************************************************************
                  Artifacts and shutdown
**************************************************************/

#[tokio::test]
async fn kept_artifacts_share_the_job_token() {
    let ws = Workspace::new();
    let engines = Arc::new(
        FakeEngines::new()
            .open_ports("1.2.3.4", &[80])
            .services("1.2.3.4", &[(80, "http", "nginx")]),
    );
    let config = Config::builder(1)
        .target("1.2.3.4,1.2.3.5")
        .output(ws.output())
        .scratch_dir(ws.scratch())
        .retain_artifacts(true)
        .build()
        .unwrap();

    run(config, &engines).await.unwrap();

    let artifacts = ws.artifacts();
    assert_eq!(artifacts.len(), 3);

    let fingerprint: Vec<&String> = artifacts
        .iter()
        .filter(|name| name.starts_with("fingerprint_"))
        .collect();
    assert_eq!(fingerprint.len(), 1);
    let token = fingerprint[0].trim_start_matches("fingerprint_");
    assert_eq!(token.len(), 32);
    assert!(artifacts.contains(&format!("discovery_{token}")));

    let invoked: PathBuf = engines.calls_to("nmap")[0].artifact.clone().unwrap();
    assert!(invoked.ends_with(fingerprint[0].as_str()));
}

#[tokio::test]
async fn every_target_is_attempted_before_shutdown() {
    let ws = Workspace::new();
    let mut engines = FakeEngines::new().with_delay(Duration::from_millis(1));
    for i in 0..=99u8 {
        if i % 3 == 0 {
            engines = engines.open_ports(&format!("172.16.0.{i}"), &[443]);
        }
    }
    let engines = Arc::new(engines);

    let config = ws.config("172.16.0.0-99", 3, 2);
    let pipeline = Pipeline::new(config, Arc::clone(&engines) as Arc<dyn ToolRunner>);
    let monitor = pipeline.monitor();
    let summary = pipeline.run().await.unwrap();

    assert_eq!(engines.calls_to("masscan").len(), 100);
    assert_eq!(engines.calls_to("nmap").len(), 34);
    assert_eq!(summary.jobs_queued, 100);
    assert_eq!(summary.empty_jobs, 66);
    assert_eq!(monitor.discovery.snapshot().status(), EngineStatus::Stopped);
    assert_eq!(monitor.fingerprint.snapshot().status(), EngineStatus::Stopped);
}
