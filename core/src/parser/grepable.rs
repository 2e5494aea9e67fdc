use relayscan_common::models::{ServiceRecord, Transport};

use super::{ArtifactParser, ParseError, is_noise, parse_host, parse_port};

const HOST_MARKER: &str = "Host:";
const PORTS_MARKER: &str = "Ports:";
const ENTRY_SEPARATOR: char = ',';
const ENTRY_FIELDS: usize = 7;

/// Parses fingerprint grepable output.
///
/// A result line looks like
/// `Host: 10.0.0.5 ()\tPorts: 80/open/tcp//http//nginx 1.24.0/, 443/closed/tcp//https///\tIgnored State: ...`
/// and every `port/state/transport/owner/service/rpc/banner` entry is checked on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrepableParser;

impl ArtifactParser for GrepableParser {
    type Record = ServiceRecord;

    fn parse_line(&self, line: &str) -> Vec<Result<ServiceRecord, ParseError>> {
        let line = line.trim();
        if is_noise(line) {
            return Vec::new();
        }

        let Some(marker) = line.find(PORTS_MARKER) else {
            return Vec::new();
        };

        let host = match host_field(line) {
            Ok(host) => host,
            Err(e) => return vec![Err(e)],
        };

        let payload: &str = &line[marker + PORTS_MARKER.len()..];
        let payload: &str = payload.split('\t').next().unwrap_or_default();

        split_entries(payload)
            .iter()
            .map(|entry| entry.trim())
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| parse_entry(host, entry).transpose())
            .collect()
    }
}

/// Splits the `Ports:` payload on commas. A fragment that does not open with `<port>/` is
/// part of the previous entry's banner and is glued back onto it.
fn split_entries(payload: &str) -> Vec<String> {
    let mut entries: Vec<String> = Vec::new();

    for fragment in payload.split(ENTRY_SEPARATOR) {
        match entries.last_mut() {
            Some(last) if !opens_entry(fragment) => {
                last.push(ENTRY_SEPARATOR);
                last.push_str(fragment);
            }
            _ => entries.push(fragment.to_string()),
        }
    }

    entries
}

fn opens_entry(fragment: &str) -> bool {
    let fragment: &str = fragment.trim_start();
    let digits: usize = fragment.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && fragment.as_bytes().get(digits) == Some(&b'/')
}

fn host_field(line: &str) -> Result<std::net::IpAddr, ParseError> {
    let value: &str = line
        .split_once(HOST_MARKER)
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .ok_or_else(|| ParseError::MissingHost(line.to_string()))?;
    parse_host(value)
}

/// `Ok(None)` for entries that are not open.
fn parse_entry(host: std::net::IpAddr, entry: &str) -> Result<Option<ServiceRecord>, ParseError> {
    let fields: Vec<&str> = entry.splitn(ENTRY_FIELDS, '/').collect();
    if fields.len() < ENTRY_FIELDS {
        return Err(ParseError::MissingFields {
            expected: ENTRY_FIELDS,
            found: fields.len(),
            text: entry.to_string(),
        });
    }

    let port: u16 = parse_port(fields[0])?;
    if fields[1] != "open" {
        return Ok(None);
    }

    Ok(Some(ServiceRecord {
        host,
        port,
        transport: Transport::from(fields[2]),
        service: fields[4].to_string(),
        banner: fields[6].trim_end_matches('/').trim().to_string(),
    }))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
