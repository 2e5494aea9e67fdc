use std::net::{IpAddr, Ipv4Addr};

use ipnetwork::{IpNetworkError, Ipv4Network};

/// Inclusive span of IPv4 addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Range {
    pub start_addr: Ipv4Addr,
    pub end_addr: Ipv4Addr,
}

impl Ipv4Range {
    pub fn new(start_addr: Ipv4Addr, end_addr: Ipv4Addr) -> Self {
        Self {
            start_addr,
            end_addr,
        }
    }

    /// Walks the range in ascending order.
    pub fn to_iter(&self) -> impl Iterator<Item = IpAddr> + use<> {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        (start..=end).map(|ip| IpAddr::V4(Ipv4Addr::from(ip)))
    }

    /// Number of addresses in the range.
    pub fn size(&self) -> u64 {
        let start: u32 = self.start_addr.into();
        let end: u32 = self.end_addr.into();
        u64::from(end.saturating_sub(start)) + 1
    }
}

/// Builds the range covered by `ip/prefix`, network and broadcast included.
pub fn cidr_range(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Range, IpNetworkError> {
    let network = Ipv4Network::new(ip, prefix)?;
    let start = network.network();
    let end = network.broadcast();

    Ok(Ipv4Range::new(start, end))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
