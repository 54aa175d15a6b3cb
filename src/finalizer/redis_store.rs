//! Redis-backed submission store
//!
//! Each submission is written once with `SET NX`, so a second finalize for the
//! same session is refused by Redis itself.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};
use uuid::Uuid;

use super::store::SubmissionStore;
use crate::error::StoreError;
use crate::scoring::GradedSubmission;

/// Redis key constants
pub mod keys {
    /// Graded submission key prefix
    pub const SUBMISSION_PREFIX: &str = "assess:submission:";

    /// Channel announcing newly finalized sessions
    pub const SUBMISSION_CHANNEL: &str = "assess:submissions";
}

const CONNECT_ATTEMPTS: u32 = 5;

pub struct RedisSubmissionStore {
    conn: ConnectionManager,
}

impl RedisSubmissionStore {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;
        let conn = get_connection_with_retry(&client).await?;
        info!("Connected to Redis at {}", redis_url);
        Ok(Self { conn })
    }

    fn key(session_id: Uuid) -> String {
        format!("{}{}", keys::SUBMISSION_PREFIX, session_id)
    }
}

#[async_trait]
impl SubmissionStore for RedisSubmissionStore {
    async fn insert(&self, submission: &GradedSubmission) -> Result<(), StoreError> {
        let json = serde_json::to_string(submission)?;
        let mut conn = self.conn.clone();

        let written: Option<String> = redis::cmd("SET")
            .arg(Self::key(submission.session_id))
            .arg(&json)
            .arg("NX")
            .query_async(&mut conn)
            .await?;

        if written.is_none() {
            return Err(StoreError::AlreadyFinalized(submission.session_id));
        }

        // Publish to channel (ignore errors as there may be no subscribers)
        let _ = conn
            .publish::<_, _, ()>(keys::SUBMISSION_CHANNEL, submission.session_id.to_string())
            .await;

        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<GradedSubmission>, StoreError> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(Self::key(session_id)).await?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }
}

/// Get a Redis connection, retrying a bounded number of times at startup
async fn get_connection_with_retry(client: &redis::Client) -> anyhow::Result<ConnectionManager> {
    let mut attempt = 1;
    loop {
        match ConnectionManager::new(client.clone()).await {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!(
                    "Failed to connect to Redis (attempt {}/{}): {}. Retrying in 3 seconds...",
                    attempt, CONNECT_ATTEMPTS, e
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            Err(e) => return Err(e).context("Could not connect to Redis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            RedisSubmissionStore::key(id),
            "assess:submission:00000000-0000-0000-0000-000000000000"
        );
    }
}
