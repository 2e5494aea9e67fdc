//! # Target Expressions
//!
//! Parses the entries of a target list or address file. An entry can be:
//! * A single IP address (e.g., `10.0.0.5`, `::1`).
//! * An IPv4 range (e.g., `10.0.0.1-10.0.0.20` or `10.0.0.1-20`).
//! * An IPv4 CIDR block (e.g., `10.0.0.0/30`).
//!
//! Ranges and blocks expand lazily into one [`ScanTarget`] per address.

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::error::TargetError;
use crate::models::ScanTarget;
use crate::network::range::{self, Ipv4Range};

/// One parsed entry of a target specification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetExpr {
    Host { target_addr: IpAddr },
    Range { ipv4_range: Ipv4Range },
}

impl FromStr for TargetExpr {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(target) = parse_host(s) {
            return Ok(target);
        }

        if let Some(target) = parse_ip_range(s)? {
            return Ok(target);
        }

        if let Some(target) = parse_cidr_range(s)? {
            return Ok(target);
        }

        Err(TargetError::InvalidAddress(s.to_string()))
    }
}

impl TargetExpr {
    /// Number of scan targets this entry expands to.
    pub fn size(&self) -> u64 {
        match self {
            TargetExpr::Host { .. } => 1,
            TargetExpr::Range { ipv4_range } => ipv4_range.size(),
        }
    }

    /// Expands the entry into scan targets, in ascending address order.
    pub fn targets(&self) -> Box<dyn Iterator<Item = ScanTarget> + Send> {
        match self {
            TargetExpr::Host { target_addr } => {
                Box::new(std::iter::once(ScanTarget::new(*target_addr)))
            }
            TargetExpr::Range { ipv4_range } => Box::new(ipv4_range.to_iter().map(ScanTarget::new)),
        }
    }
}

/// Splits a comma-separated target list into trimmed, non-empty entries.
pub fn split_list(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|part| !part.is_empty())
}

/// Reads one line of an address file.
///
/// Returns `None` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> Option<Result<TargetExpr, TargetError>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse())
}

fn parse_host(s: &str) -> Option<TargetExpr> {
    s.parse::<IpAddr>()
        .ok()
        .map(|target_addr| TargetExpr::Host { target_addr })
}

/// Parses a range string like "1.1.1.1-2.2.2.2" or "1.1.1.1-50".
fn parse_ip_range(s: &str) -> Result<Option<TargetExpr>, TargetError> {
    let Some((start_str, end_str)) = s.split_once('-') else {
        return Ok(None);
    };

    let invalid = |reason: String| TargetError::InvalidRange {
        entry: s.to_string(),
        reason,
    };

    let start_addr = start_str
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|e| invalid(format!("invalid start address '{start_str}': {e}")))?;

    let end_addr = parse_range_end_addr(end_str.trim(), &start_addr).map_err(invalid)?;

    if u32::from(start_addr) > u32::from(end_addr) {
        return Err(invalid(format!("{start_addr} comes after {end_addr}")));
    }

    let ipv4_range = Ipv4Range::new(start_addr, end_addr);
    Ok(Some(TargetExpr::Range { ipv4_range }))
}

/// Handles abbreviated forms like "192.168.1.1-50" (implies 192.168.1.50)
/// and full forms like "192.168.1.1-192.168.1.255".
fn parse_range_end_addr(end_str: &str, start_addr: &Ipv4Addr) -> Result<Ipv4Addr, String> {
    if let Ok(full_addr) = end_str.parse::<Ipv4Addr>() {
        return Ok(full_addr);
    }

    if end_str.is_empty() {
        return Err("end of range cannot be empty".to_string());
    }

    let mut end_octets = start_addr.octets();
    let partial_octets: Vec<u8> = end_str
        .split('.')
        .map(|octet_str| octet_str.parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|e| format!("invalid end of range '{end_str}': {e}"))?;

    if partial_octets.len() > 4 {
        return Err(format!("end of range has too many octets: {end_str}"));
    }

    let start_index = 4 - partial_octets.len();
    end_octets[start_index..].copy_from_slice(&partial_octets);

    Ok(Ipv4Addr::from(end_octets))
}

/// Parses CIDR notation like "192.168.1.0/24".
fn parse_cidr_range(s: &str) -> Result<Option<TargetExpr>, TargetError> {
    let Some((ip_str, prefix_str)) = s.split_once('/') else {
        return Ok(None);
    };

    let invalid = |reason: String| TargetError::InvalidCidr {
        entry: s.to_string(),
        reason,
    };

    let ipv4_addr = ip_str
        .parse::<Ipv4Addr>()
        .map_err(|e| invalid(format!("invalid address '{ip_str}': {e}")))?;

    let prefix = prefix_str
        .parse::<u8>()
        .map_err(|e| invalid(format!("invalid prefix '{prefix_str}': {e}")))?;

    let ipv4_range = range::cidr_range(ipv4_addr, prefix).map_err(|e| invalid(e.to_string()))?;

    Ok(Some(TargetExpr::Range { ipv4_range }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
