//! End-to-end pipeline scenarios against scripted engines.

#[cfg(test)]
mod engines;
#[cfg(test)]
mod pipeline;
