//! Process configuration, read from the environment (and `.env` via dotenvy)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::sandbox::SandboxConfig;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub bind_addr: SocketAddr,
    pub sandbox: SandboxConfig,
    pub tick_interval: Duration,
    /// How long finalized sessions stay in memory after finishing
    pub session_retention: Duration,
    pub exams_path: PathBuf,
    /// Overrides the embedded language table when set
    pub languages_path: Option<PathBuf>,
    /// Submissions are kept in memory when unset
    pub redis_url: Option<String>,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SandboxConfig::default();

        let sandbox = SandboxConfig {
            base_url: lookup("SANDBOX_URL").unwrap_or(defaults.base_url),
            compile_timeout_ms: parse_or(
                &lookup,
                "SANDBOX_COMPILE_TIMEOUT_MS",
                defaults.compile_timeout_ms,
            )?,
            run_timeout_ms: parse_or(&lookup, "SANDBOX_RUN_TIMEOUT_MS", defaults.run_timeout_ms)?,
            request_timeout_ms: parse_or(
                &lookup,
                "SANDBOX_REQUEST_TIMEOUT_MS",
                defaults.request_timeout_ms,
            )?,
        };

        let tick_ms: u64 = parse_or(&lookup, "TICK_INTERVAL_MS", 1000)?;
        if tick_ms == 0 {
            anyhow::bail!("TICK_INTERVAL_MS must be positive");
        }

        let retention_secs: u64 = parse_or(&lookup, "SESSION_RETENTION_SECS", 3600)?;

        Ok(Self {
            bind_addr: parse_or(&lookup, "ASSESS_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            sandbox,
            tick_interval: Duration::from_millis(tick_ms),
            session_retention: Duration::from_secs(retention_secs),
            exams_path: lookup("EXAMS_PATH")
                .unwrap_or_else(|| "./files/exams.json".into())
                .into(),
            languages_path: lookup("LANGUAGES_CONFIG").map(PathBuf::from),
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<EngineConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.sandbox.base_url, "http://localhost:2000");
        assert_eq!(cfg.sandbox.compile_timeout_ms, 10_000);
        assert_eq!(cfg.sandbox.run_timeout_ms, 3_000);
        assert_eq!(cfg.tick_interval, Duration::from_secs(1));
        assert_eq!(cfg.session_retention, Duration::from_secs(3600));
        assert_eq!(cfg.exams_path, PathBuf::from("./files/exams.json"));
        assert!(cfg.languages_path.is_none());
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("ASSESS_BIND_ADDR", "127.0.0.1:9000"),
            ("SANDBOX_URL", "http://piston:2000"),
            ("SANDBOX_RUN_TIMEOUT_MS", "5000"),
            ("TICK_INTERVAL_MS", "250"),
            ("SESSION_RETENTION_SECS", "600"),
            ("REDIS_URL", "redis://cache:6379"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.sandbox.base_url, "http://piston:2000");
        assert_eq!(cfg.sandbox.run_timeout_ms, 5000);
        assert_eq!(cfg.tick_interval, Duration::from_millis(250));
        assert_eq!(cfg.session_retention, Duration::from_secs(600));
        assert_eq!(cfg.redis_url.as_deref(), Some("redis://cache:6379"));
    }

    #[test]
    fn test_invalid_numbers_fail() {
        assert!(config(&[("SANDBOX_COMPILE_TIMEOUT_MS", "ten")]).is_err());
        assert!(config(&[("TICK_INTERVAL_MS", "0")]).is_err());
        assert!(config(&[("ASSESS_BIND_ADDR", "nowhere")]).is_err());
    }
}
