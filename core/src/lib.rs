//! The scanning pipeline of `relayscan`.
//!
//! * **[`pipeline`]**: wires the stages together and owns shutdown sequencing.
//! * **[`producer`]**, **[`discovery`]**, **[`fingerprint`]**, **[`sink`]**: the four stages.
//! * **[`queue`]**: the bounded close-once queues between stages.
//! * **[`runner`]**: how external engines are invoked.
//! * **[`parser`]**: readers for the engines' artifact formats.
//! * **[`lines`]**: lossy line reading for address files and artifacts.
//! * **[`artifact`]**, **[`pool`]**, **[`stats`]**: artifact naming, worker accounting, counters.

pub mod artifact;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod lines;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod producer;
pub mod queue;
pub mod runner;
pub mod sink;
pub mod stats;

#[cfg(test)]
mod testing;
