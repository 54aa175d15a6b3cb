//! Sandbox configuration
//!
//! Where the execution service lives and how long it may spend per stage.

/// Sandbox configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxConfig {
    /// Base URL of the execution service (default: http://localhost:2000)
    pub base_url: String,
    /// Compile stage limit in milliseconds (default: 10000ms)
    pub compile_timeout_ms: u64,
    /// Run stage limit in milliseconds (default: 3000ms)
    pub run_timeout_ms: u64,
    /// Transport-level timeout for one HTTP round trip (default: 30000ms)
    pub request_timeout_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:2000".to_string(),
            compile_timeout_ms: 10_000,
            run_timeout_ms: 3_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl SandboxConfig {
    /// Create config pointing at a specific service
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn execute_url(&self) -> String {
        format!("{}/api/v2/execute", self.base_url.trim_end_matches('/'))
    }
}
