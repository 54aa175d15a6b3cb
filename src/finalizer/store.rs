//! Submission persistence boundary

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::scoring::GradedSubmission;

/// Where graded submissions end up. Implementations must refuse a second
/// write for the same session id.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: &GradedSubmission) -> Result<(), StoreError>;

    async fn get(&self, session_id: Uuid) -> Result<Option<GradedSubmission>, StoreError>;
}

/// Process-local store, used when no Redis is configured
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    submissions: Mutex<HashMap<Uuid, GradedSubmission>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.submissions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.lock().is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn insert(&self, submission: &GradedSubmission) -> Result<(), StoreError> {
        let mut submissions = self.submissions.lock();
        if submissions.contains_key(&submission.session_id) {
            return Err(StoreError::AlreadyFinalized(submission.session_id));
        }
        submissions.insert(submission.session_id, submission.clone());
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<GradedSubmission>, StoreError> {
        Ok(self.submissions.lock().get(&session_id).cloned())
    }
}
