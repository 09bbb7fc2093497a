//! Core types and trait definitions for the Herald campaign dispatcher.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod campaign;
pub mod contact;
pub mod error;
pub mod recipient;
pub mod source;
pub mod store;
pub mod transport;

pub use error::{Error, Result};
