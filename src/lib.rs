//! Timed assessment engine
//!
//! Runs exam sessions against a deadline, grades coding answers in an external
//! sandbox and persists exactly one graded submission per session.

pub mod answers;
pub mod api;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod evaluator;
pub mod exam;
pub mod finalizer;
pub mod harness;
pub mod languages;
pub mod sandbox;
pub mod scoring;
pub mod session;

#[cfg(test)]
mod testing;

pub use error::{EngineError, Result};
