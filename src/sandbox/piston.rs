//! HTTP client for a Piston-compatible execution service

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ExecutionRequest, SandboxConfig, SandboxExecutor, SandboxOutcome};
use crate::error::{EngineError, Result};

#[derive(Debug, Serialize)]
struct PistonRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: Vec<PistonFile<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
    compile_timeout: u64,
    run_timeout: u64,
}

#[derive(Debug, Serialize)]
struct PistonFile<'a> {
    name: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct PistonResponse {
    run: PistonStage,
    #[serde(default)]
    compile: Option<PistonStage>,
}

#[derive(Debug, Default, Deserialize)]
struct PistonStage {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    signal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PistonErrorBody {
    message: String,
}

impl PistonStage {
    /// A compile stage failed if it exited non-zero or was killed. Services
    /// that omit the exit code are judged by stderr alone.
    fn compile_failed(&self) -> bool {
        match (self.code, &self.signal) {
            (_, Some(_)) => true,
            (Some(code), None) => code != 0,
            (None, None) => !self.stderr.trim().is_empty(),
        }
    }

    fn compile_message(&self) -> String {
        if !self.stderr.trim().is_empty() {
            self.stderr.clone()
        } else if !self.stdout.trim().is_empty() {
            self.stdout.clone()
        } else if let Some(signal) = &self.signal {
            format!("Compilation terminated by {}", signal)
        } else {
            "Compilation failed".to_string()
        }
    }
}

impl From<PistonResponse> for SandboxOutcome {
    fn from(response: PistonResponse) -> Self {
        if let Some(compile) = response.compile.as_ref().filter(|c| c.compile_failed()) {
            return SandboxOutcome::compile_failure(compile.compile_message());
        }

        SandboxOutcome {
            compile_error: None,
            stdout: response.run.stdout,
            stderr: response.run.stderr,
            exit_code: response.run.code,
            signal: response.run.signal,
        }
    }
}

/// Client for the execution service; cheap to clone, shares one connection pool
#[derive(Debug, Clone)]
pub struct PistonClient {
    http: reqwest::Client,
    config: SandboxConfig,
}

impl PistonClient {
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| EngineError::SandboxUnavailable(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

#[async_trait]
impl SandboxExecutor for PistonClient {
    async fn execute(&self, request: &ExecutionRequest) -> Result<SandboxOutcome> {
        let body = PistonRequest {
            language: &request.language,
            version: &request.version,
            files: vec![PistonFile {
                name: &request.file_name,
                content: &request.source,
            }],
            stdin: request.stdin.as_deref(),
            compile_timeout: request.compile_timeout_ms,
            run_timeout: request.run_timeout_ms,
        };

        debug!(
            "Submitting {}-{} harness ({} bytes) to sandbox",
            request.language,
            request.version,
            request.source.len()
        );

        let response = self
            .http
            .post(self.config.execute_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Sandbox request failed: {}", e);
                EngineError::SandboxUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PistonErrorBody>(&text)
                .map(|b| b.message)
                .unwrap_or(text);

            if status == reqwest::StatusCode::BAD_REQUEST && message.contains("runtime is unknown")
            {
                return Err(EngineError::UnsupportedLanguage(format!(
                    "{}-{}",
                    request.language, request.version
                )));
            }

            warn!("Sandbox returned {}: {}", status, message);
            return Err(EngineError::SandboxUnavailable(format!(
                "sandbox returned {}: {}",
                status, message
            )));
        }

        let parsed: PistonResponse = response
            .json()
            .await
            .map_err(|e| EngineError::SandboxUnavailable(format!("malformed response: {}", e)))?;

        let outcome = SandboxOutcome::from(parsed);
        debug!(
            "Sandbox outcome: compile_error={}, exit_code={:?}, signal={:?}, stdout={}",
            outcome.compile_error.is_some(),
            outcome.exit_code,
            outcome.signal,
            outcome.stdout.chars().take(200).collect::<String>()
        );

        Ok(outcome)
    }
}
