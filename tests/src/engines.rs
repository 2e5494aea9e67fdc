use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use relayscan_common::config::{DEFAULT_DISCOVERY_BIN, DEFAULT_FINGERPRINT_BIN};
use relayscan_core::runner::{Invocation, ToolError, ToolOutput, ToolRunner};

/// Behaviour of one engine for one host.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Exit 0 after writing this artifact.
    Writes(String),
    /// Exit non-zero.
    Fails,
}

/// Stands in for both engines, keyed by program and the host being scanned.
///
/// Hosts without a scripted reply get an empty artifact.
#[derive(Debug, Default)]
pub struct FakeEngines {
    discovery: HashMap<IpAddr, Reply>,
    fingerprint: HashMap<IpAddr, Reply>,
    delay: Duration,
    calls: Mutex<Vec<Invocation>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeEngines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovery reports the given open tcp ports for `host`.
    pub fn open_ports(mut self, host: &str, ports: &[u16]) -> Self {
        let mut artifact = String::from("#masscan\n");
        for port in ports {
            artifact.push_str(&format!("open tcp {port} {host} 1700000000\n"));
        }
        artifact.push_str("# end\n");
        self.discovery.insert(ip(host), Reply::Writes(artifact));
        self
    }

    /// Fingerprinting `host` identifies `(port, service, banner)` triples.
    pub fn services(mut self, host: &str, services: &[(u16, &str, &str)]) -> Self {
        let entries: Vec<String> = services
            .iter()
            .map(|(port, service, banner)| format!("{port}/open/tcp//{service}//{banner}/"))
            .collect();
        let artifact = format!(
            "# Nmap 7.94 scan initiated\nHost: {host} ()\tStatus: Up\nHost: {host} ()\tPorts: {}\tIgnored State: closed (998)\n# Nmap done\n",
            entries.join(", ")
        );
        self.fingerprint.insert(ip(host), Reply::Writes(artifact));
        self
    }

    pub fn discovery_reply(mut self, host: &str, reply: Reply) -> Self {
        self.discovery.insert(ip(host), reply);
        self
    }

    pub fn fingerprint_reply(mut self, host: &str, reply: Reply) -> Self {
        self.fingerprint.insert(ip(host), reply);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|inv| inv.program == Path::new(program))
            .cloned()
            .collect()
    }

    /// Most invocations that were ever running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[async_trait]
impl ToolRunner for FakeEngines {
    async fn execute(&self, invocation: &Invocation) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(invocation.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let program = invocation.program.display().to_string();
        let host: IpAddr = invocation.args[0].to_string_lossy().parse().unwrap();

        let scripts = if invocation.program == Path::new(DEFAULT_DISCOVERY_BIN) {
            &self.discovery
        } else if invocation.program == Path::new(DEFAULT_FINGERPRINT_BIN) {
            &self.fingerprint
        } else {
            return Err(ToolError::Spawn {
                program,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        };

        let artifact: &str = match scripts.get(&host) {
            Some(Reply::Writes(artifact)) => artifact,
            Some(Reply::Fails) => {
                return Err(ToolError::Exit {
                    program,
                    status: "exit status: 1".to_string(),
                    stdout: String::new(),
                    stderr: "FAIL: could not determine if runtime is up".to_string(),
                })
            }
            None => "",
        };

        let path = invocation.artifact.as_ref().unwrap();
        tokio::fs::write(path, artifact)
            .await
            .map_err(|source| ToolError::Spawn { program, source })?;

        Ok(ToolOutput::default())
    }
}
