use relayscan_common::models::{PortRecord, Transport};

use super::{ArtifactParser, ParseError, is_noise, parse_host, parse_port};

const FIELDS: usize = 5;

/// Parses discovery list output: `<state> <transport> <port> <host> <timestamp>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListParser;

impl ArtifactParser for ListParser {
    type Record = PortRecord;

    fn parse_line(&self, line: &str) -> Vec<Result<PortRecord, ParseError>> {
        let line = line.trim();
        if is_noise(line) {
            return Vec::new();
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < FIELDS {
            return vec![Err(ParseError::MissingFields {
                expected: FIELDS,
                found: fields.len(),
                text: line.to_string(),
            })];
        }

        if fields[0] != "open" {
            return Vec::new();
        }

        let record = parse_port(fields[2]).and_then(|port| {
            Ok(PortRecord {
                host: parse_host(fields[3])?,
                port,
                transport: Transport::from(fields[1]),
            })
        });

        vec![record]
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
