//! Sandbox module - client side of the remote execution service
//!
//! This module provides:
//! - `SandboxExecutor`: the contract the evaluator needs from an execution service
//! - `PistonClient`: HTTP implementation against a Piston-compatible API
//! - Wire types for the service's request/response JSON
//!
//! The sandbox module does NOT:
//! - Interpret outcomes (that's the evaluator's job)
//! - Generate harnesses
//! - Retry; a transport failure is reported once as `SandboxUnavailable`

pub mod config;
pub mod piston;

use async_trait::async_trait;

use crate::error::Result;
use crate::languages::LanguageConfig;

// Re-exports for convenience
pub use config::SandboxConfig;
pub use piston::PistonClient;

/// One compile/run request for a single harness
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    /// Runtime name as the service knows it
    pub language: String,
    pub version: String,
    pub file_name: String,
    pub source: String,
    pub stdin: Option<String>,
    pub compile_timeout_ms: u64,
    pub run_timeout_ms: u64,
}

impl ExecutionRequest {
    pub fn new(runtime: &LanguageConfig, source: impl Into<String>) -> Self {
        let defaults = SandboxConfig::default();
        Self {
            language: runtime.runtime.clone(),
            version: runtime.version.clone(),
            file_name: runtime.source_file.clone(),
            source: source.into(),
            stdin: None,
            compile_timeout_ms: defaults.compile_timeout_ms,
            run_timeout_ms: defaults.run_timeout_ms,
        }
    }

    pub fn with_stdin(mut self, stdin: Option<String>) -> Self {
        self.stdin = stdin;
        self
    }

    pub fn with_timeouts(mut self, compile_timeout_ms: u64, run_timeout_ms: u64) -> Self {
        self.compile_timeout_ms = compile_timeout_ms;
        self.run_timeout_ms = run_timeout_ms;
        self
    }
}

/// Structured result of one sandbox call (raw, no verdict interpretation)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SandboxOutcome {
    /// Set when compilation failed; carries the compiler's diagnostics
    pub compile_error: Option<String>,
    pub stdout: String,
    pub stderr: String,
    /// Exit code of the run stage, when the service reports one
    pub exit_code: Option<i32>,
    /// Signal that terminated the run stage (e.g. "SIGKILL" on timeout)
    pub signal: Option<String>,
}

impl SandboxOutcome {
    /// Outcome of a clean run that printed `stdout`
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code: Some(0),
            ..Self::default()
        }
    }

    pub fn compile_failure(message: impl Into<String>) -> Self {
        Self {
            compile_error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn runtime_failure(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stderr: stderr.into(),
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }
}

/// Execution service contract
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    /// Compile (if needed) and run one harness. One network call per invocation.
    async fn execute(&self, request: &ExecutionRequest) -> Result<SandboxOutcome>;
}
