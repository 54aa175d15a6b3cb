//! Session module - one taker's attempt at one exam
//!
//! `Session` owns the mutable attempt state (position, answers, status) and
//! the one-shot result cell. `SessionController` drives sessions through
//! their lifecycle and owns the tick loop.
//!
//! Lifecycle: `InProgress --(deadline | submit)--> Finalizing --> Finalized`.
//! `Finalizing` is the transient state held by the single in-flight finalize;
//! if grading fails the session drops back to `InProgress`.

pub mod controller;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use crate::answers::{AnswerStore, AnswerValue};
use crate::error::{EngineError, Result};
use crate::exam::{ExamDefinition, QuestionView};
use crate::finalizer::FinalizedRecord;

pub use controller::{SessionController, TickOutcome};

const IN_PROGRESS: u8 = 0;
const FINALIZING: u8 = 1;
const FINALIZED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Finalizing,
    Finalized,
}

impl SessionStatus {
    fn from_raw(raw: u8) -> Self {
        match raw {
            IN_PROGRESS => SessionStatus::InProgress,
            FINALIZING => SessionStatus::Finalizing,
            _ => SessionStatus::Finalized,
        }
    }
}

#[derive(Debug, Default)]
struct Progress {
    current_index: usize,
    answers: AnswerStore,
}

pub struct Session {
    id: Uuid,
    exam: Arc<ExamDefinition>,
    taker_id: String,
    started_at: DateTime<Utc>,
    deadline_at: Option<DateTime<Utc>>,
    status: AtomicU8,
    progress: RwLock<Progress>,
    finalized: OnceCell<FinalizedRecord>,
}

impl Session {
    /// Start a new attempt. Untimed exams (duration 0) get no deadline.
    pub fn start(exam: Arc<ExamDefinition>, taker_id: &str, now: DateTime<Utc>) -> Result<Self> {
        exam.validate()?;

        let deadline_at = exam
            .is_timed()
            .then(|| now + Duration::minutes(i64::from(exam.duration_minutes)));

        Ok(Self {
            id: Uuid::new_v4(),
            exam,
            taker_id: taker_id.to_string(),
            started_at: now,
            deadline_at,
            status: AtomicU8::new(IN_PROGRESS),
            progress: RwLock::new(Progress::default()),
            finalized: OnceCell::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn exam(&self) -> &ExamDefinition {
        &self.exam
    }

    pub fn taker_id(&self) -> &str {
        &self.taker_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
        self.deadline_at
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_raw(self.status.load(Ordering::Acquire))
    }

    pub fn current_index(&self) -> usize {
        self.progress.read().current_index
    }

    /// Time left before the deadline, `None` for untimed sessions
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline_at
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }

    /// True once `now` has reached the deadline; never true when untimed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline_at.is_some_and(|deadline| now >= deadline)
    }

    pub fn navigate(&self, target_index: usize) -> Result<()> {
        let len = self.exam.questions.len();
        if target_index >= len {
            return Err(EngineError::OutOfRange {
                index: target_index,
                len,
            });
        }

        let mut progress = self.progress.write();
        self.ensure_in_progress()?;
        progress.current_index = target_index;
        debug!("Session {} moved to question {}", self.id, target_index);
        Ok(())
    }

    /// Overwrite the answer for `question_id`. The status check and the write
    /// happen under the same lock a finalize takes to snapshot answers.
    pub fn record_answer(&self, question_id: &str, value: AnswerValue) -> Result<()> {
        let mut progress = self.progress.write();
        self.ensure_in_progress()?;
        progress.answers.insert(&self.exam, question_id, value)?;
        debug!("Session {} recorded answer for {}", self.id, question_id);
        Ok(())
    }

    pub fn answer(&self, question_id: &str) -> Option<AnswerValue> {
        self.progress.read().answers.get(question_id).cloned()
    }

    pub fn answers_snapshot(&self) -> AnswerStore {
        self.progress.read().answers.clone()
    }

    pub fn current_question(&self) -> QuestionView {
        let index = self.current_index();
        self.exam.questions[index].client_view(index)
    }

    /// The stored result, once finalized
    pub fn record(&self) -> Option<&FinalizedRecord> {
        self.finalized.get()
    }

    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let progress = self.progress.read();
        SessionView {
            session_id: self.id,
            exam_id: self.exam.id.clone(),
            exam_title: self.exam.title.clone(),
            taker_id: self.taker_id.clone(),
            status: self.status(),
            started_at: self.started_at,
            deadline_at: self.deadline_at,
            remaining_seconds: self.remaining(now).map(|d| d.num_seconds()),
            current_question_index: progress.current_index,
            question_count: self.exam.questions.len(),
            answered: progress.answers.answered_ids(),
        }
    }

    fn ensure_in_progress(&self) -> Result<()> {
        if self.status.load(Ordering::Acquire) != IN_PROGRESS {
            return Err(EngineError::SessionFinalized);
        }
        Ok(())
    }

    pub(crate) fn finalized_cell(&self) -> &OnceCell<FinalizedRecord> {
        &self.finalized
    }

    /// Flip `InProgress -> Finalizing`. The returned guard rolls the flip
    /// back on drop unless committed.
    pub(crate) fn begin_finalize(&self) -> Result<FinalizeGuard<'_>> {
        // Taking the write lock orders the flip after any in-flight answer write
        let _progress = self.progress.write();
        self.status
            .compare_exchange(IN_PROGRESS, FINALIZING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EngineError::SessionFinalized)?;
        Ok(FinalizeGuard {
            session: self,
            committed: false,
        })
    }
}

pub(crate) struct FinalizeGuard<'a> {
    session: &'a Session,
    committed: bool,
}

impl FinalizeGuard<'_> {
    pub(crate) fn commit(mut self) {
        self.session.status.store(FINALIZED, Ordering::Release);
        self.committed = true;
    }
}

impl Drop for FinalizeGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.session.status.store(IN_PROGRESS, Ordering::Release);
        }
    }
}

/// Session as reported to the UI layer
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub exam_id: String,
    pub exam_title: String,
    pub taker_id: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub remaining_seconds: Option<i64>,
    pub current_question_index: usize,
    pub question_count: usize,
    pub answered: Vec<String>,
}
