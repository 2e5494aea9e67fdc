//! # Pipeline Data Model
//!
//! Value types handed between pipeline stages. Nothing here is mutated after
//! construction; every stage hands ownership to the next through a queue.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A single address handed to one discovery worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanTarget {
    pub addr: IpAddr,
}

impl ScanTarget {
    pub fn new(addr: IpAddr) -> Self {
        Self { addr }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Transport protocol reported by the scanning engines.
///
/// Unknown tokens are kept verbatim so nothing the engines report is lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Udp,
    Sctp,
    Other(String),
}

impl From<&str> for Transport {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Transport::Tcp,
            "udp" => Transport::Udp,
            "sctp" => Transport::Sctp,
            other => Transport::Other(other.to_string()),
        }
    }
}

impl FromStr for Transport {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Transport::from(s))
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("tcp"),
            Transport::Udp => f.write_str("udp"),
            Transport::Sctp => f.write_str("sctp"),
            Transport::Other(name) => f.write_str(name),
        }
    }
}

/// One open port found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRecord {
    pub host: IpAddr,
    pub port: u16,
    pub transport: Transport,
}

/// Unique token naming the artifacts of one target's trip through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Mints a token from 128 random bits.
    pub fn fresh() -> Self {
        let bits: u128 = rand::random();
        Self(format!("{bits:032x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit of work for the fingerprint engine.
///
/// Every [`PortRecord`] in `ports` belongs to `host`. An empty job is valid and
/// is discarded by the fingerprint engine without invoking anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintJob {
    pub token: CorrelationToken,
    pub host: IpAddr,
    pub ports: Vec<PortRecord>,
}

impl FingerprintJob {
    pub fn new(token: CorrelationToken, host: IpAddr, ports: Vec<PortRecord>) -> Self {
        Self { token, host, ports }
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Port list in job order, joined with commas.
    pub fn port_list(&self) -> String {
        self.ports
            .iter()
            .map(|record| record.port.to_string())
            .collect::<Vec<String>>()
            .join(",")
    }
}

/// Final output unit: one fingerprinted port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRecord {
    pub host: IpAddr,
    pub port: u16,
    pub transport: Transport,
    pub service: String,
    pub banner: String,
}

impl fmt::Display for ServiceRecord {
    /// Renders the output line `host, transport, port, service, banner`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}",
            self.host, self.transport, self.port, self.service, self.banner
        )
    }
}

/// Lifecycle tag of a worker. Observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Init,
    Running,
    Stopped,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EngineStatus::Init => "init",
            EngineStatus::Running => "running",
            EngineStatus::Stopped => "stopped",
        };
        f.write_str(label)
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
