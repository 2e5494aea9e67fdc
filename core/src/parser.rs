//! # Artifact Parsers
//!
//! Engines write their results to artifact files. Each artifact format has its own
//! [`ArtifactParser`], which turns a single line into zero or more records. Lines are
//! parsed independently of each other, so a broken line never affects its neighbours.
//!
//! * [`list::ListParser`] reads the discovery engine's list output.
//! * [`grepable::GrepableParser`] reads the fingerprint engine's grepable output.

pub mod grepable;
pub mod list;

use std::net::IpAddr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected at least {expected} fields, found {found} in '{text}'")]
    MissingFields {
        expected: usize,
        found: usize,
        text: String,
    },

    #[error("invalid port '{0}'")]
    InvalidPort(String),

    #[error("invalid host '{0}'")]
    InvalidHost(String),

    #[error("no 'Host:' field in '{0}'")]
    MissingHost(String),
}

pub trait ArtifactParser {
    type Record;

    /// Parses one artifact line. An empty result means the line carries no records.
    fn parse_line(&self, line: &str) -> Vec<Result<Self::Record, ParseError>>;
}

/// Blank lines and `#` comments never carry records.
fn is_noise(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

fn parse_port(value: &str) -> Result<u16, ParseError> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| ParseError::InvalidPort(value.to_string()))
}

fn parse_host(value: &str) -> Result<IpAddr, ParseError> {
    value
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ParseError::InvalidHost(value.to_string()))
}
