//! Test doubles shared by the unit tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::sandbox::{ExecutionRequest, SandboxExecutor, SandboxOutcome};

type Responder = dyn Fn(&ExecutionRequest) -> Result<SandboxOutcome> + Send + Sync;

/// Sandbox that answers from a closure and records every request
pub struct ScriptedSandbox {
    responder: Box<Responder>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl ScriptedSandbox {
    pub fn new(
        responder: impl Fn(&ExecutionRequest) -> Result<SandboxOutcome> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            delay: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Like `new`, but every call takes `delay` to answer
    pub fn slow(
        delay: Duration,
        responder: impl Fn(&ExecutionRequest) -> Result<SandboxOutcome> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            delay: Some(delay),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Python-only sandbox: evaluates `add(a, b)` harnesses by summing the
    /// integer arguments of the last call, optionally off by one to fake a bug.
    pub fn adder(off_by: i64) -> Arc<Self> {
        Self::new(move |req| {
            let call = req
                .source
                .lines()
                .rev()
                .find(|l| l.contains("add("))
                .unwrap_or_default();
            let args = call
                .rsplit("add(")
                .next()
                .and_then(|rest| rest.split(')').next())
                .unwrap_or_default();
            let sum: i64 = args
                .split(',')
                .filter_map(|a| a.trim().parse::<i64>().ok())
                .sum();
            Ok(SandboxOutcome::success(format!("{}\n", sum + off_by)))
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl SandboxExecutor for ScriptedSandbox {
    async fn execute(&self, request: &ExecutionRequest) -> Result<SandboxOutcome> {
        self.requests.lock().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request)
    }
}
