//! The Herald dispatch engine.
//!
//! Sequences a campaign run end to end: recipient resolution across the
//! three targeting strategies, suppression filtering, durable recipient
//! persistence, and the fail-isolated delivery loop. Works against any
//! implementation of the `herald-core` trait seams.

pub mod dispatch;
pub mod error;
pub mod orchestrate;
pub mod render;
pub mod resolve;

pub use error::{Error, Result};
pub use orchestrate::{
  DispatchOptions, DispatchRequest, DispatchSummary, Orchestrator,
};

#[cfg(test)]
mod tests;
