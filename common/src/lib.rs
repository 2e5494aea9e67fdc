//! Shared building blocks of `relayscan`.
//!
//! * **[`config`]**: the immutable run configuration and its builder.
//! * **[`models`]**: values passed between pipeline stages.
//! * **[`network`]**: target expressions (addresses, ranges, CIDR blocks).
//! * **[`error`]**: configuration and target parsing errors.

pub mod config;
pub mod error;
pub mod models;
pub mod network;
