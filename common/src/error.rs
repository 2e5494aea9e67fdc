use std::path::PathBuf;

use thiserror::Error;

/// Problems found while assembling a [`Config`](crate::config::Config).
///
/// All of these are fatal and surface before any pipeline stage starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("'target' and 'input' cannot be set at the same time")]
    ConflictingTargets,

    #[error("one of 'target' or 'input' must be set")]
    MissingTargets,

    #[error("target list is empty")]
    EmptyTargetList,

    #[error("{stage} worker count must be at least 1")]
    ZeroWorkers { stage: &'static str },

    #[error("discovery rate must be at least 1 packet per second")]
    ZeroRate,

    #[error("tool timeout must be greater than zero")]
    ZeroTimeout,

    #[error("scratch directory cannot be empty")]
    EmptyScratchDir,

    #[error("output path '{}' is a directory", .0.display())]
    OutputIsDirectory(PathBuf),
}

/// A target expression that could not be turned into addresses.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("invalid range '{entry}': {reason}")]
    InvalidRange { entry: String, reason: String },

    #[error("invalid CIDR block '{entry}': {reason}")]
    InvalidCidr { entry: String, reason: String },
}
