use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{Session, SessionStatus, SessionView};
use crate::answers::AnswerValue;
use crate::catalog::ExamCatalog;
use crate::error::{EngineError, Result};
use crate::evaluator::ExecutionResultView;
use crate::exam::{ExamDefinition, QuestionKind, QuestionView};
use crate::finalizer::SubmissionFinalizer;
use crate::scoring::GradedSubmission;

/// What a clock check did to a session
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Still open; `remaining` is `None` for untimed sessions
    Running { remaining: Option<Duration> },
    Finalized(GradedSubmission),
}

/// Finalized result with per-test-case detail, redacted for the exam taker
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub submission: GradedSubmission,
    pub coding: Vec<CodingResultView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodingResultView {
    pub question_id: String,
    pub passed: usize,
    pub total: usize,
    pub earned: u32,
    pub marks: u32,
    pub results: Vec<ExecutionResultView>,
}

/// How long a finalized session stays addressable before the tick drops it
pub const DEFAULT_RETENTION_SECS: i64 = 3600;

/// Owns every live session and funnels both finalize triggers (deadline and
/// explicit submit) into the finalizer.
pub struct SessionController {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    catalog: Arc<dyn ExamCatalog>,
    finalizer: Arc<SubmissionFinalizer>,
    retention: Duration,
}

impl SessionController {
    pub fn new(catalog: Arc<dyn ExamCatalog>, finalizer: Arc<SubmissionFinalizer>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            catalog,
            finalizer,
            retention: Duration::seconds(DEFAULT_RETENTION_SECS),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn start(&self, exam_id: &str, taker_id: &str) -> Result<Arc<Session>> {
        let exam = self
            .catalog
            .get(exam_id)
            .ok_or_else(|| EngineError::ExamNotFound(exam_id.to_string()))?;
        self.start_with(exam, taker_id, Utc::now())
    }

    /// Start a session for an exam that did not come from the catalog
    pub fn start_with(
        &self,
        exam: Arc<ExamDefinition>,
        taker_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Arc<Session>> {
        let session = Arc::new(Session::start(exam, taker_id, now)?);

        info!(
            "Session started: session_id={}, exam={}, taker={}, deadline={}",
            session.id(),
            session.exam().id,
            taker_id,
            session
                .deadline_at()
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| "none".to_string())
        );

        self.sessions
            .write()
            .insert(session.id(), Arc::clone(&session));
        Ok(session)
    }

    pub fn session(&self, session_id: Uuid) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .get(&session_id)
            .cloned()
            .ok_or(EngineError::SessionNotFound(session_id))
    }

    pub fn view(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<SessionView> {
        Ok(self.session(session_id)?.view(now))
    }

    pub fn navigate(&self, session_id: Uuid, target_index: usize) -> Result<SessionView> {
        let session = self.session(session_id)?;
        session.navigate(target_index)?;
        Ok(session.view(Utc::now()))
    }

    pub fn record_answer(
        &self,
        session_id: Uuid,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<SessionView> {
        let session = self.session(session_id)?;
        session.record_answer(question_id, value)?;
        Ok(session.view(Utc::now()))
    }

    pub fn current_question(&self, session_id: Uuid) -> Result<QuestionView> {
        Ok(self.session(session_id)?.current_question())
    }

    pub fn remaining(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<Option<Duration>> {
        Ok(self.session(session_id)?.remaining(now))
    }

    /// Clock check for one session. Past the deadline this finalizes; an
    /// untimed session is never finalized here.
    pub async fn tick(&self, session_id: Uuid, now: DateTime<Utc>) -> Result<TickOutcome> {
        let session = self.session(session_id)?;
        tick_session(&self.finalizer, &session, now).await
    }

    /// Drop sessions finalized at least `retention` before `now`. Their
    /// submissions stay in the store; only the in-memory session goes.
    pub fn evict_finalized(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| {
            session
                .record()
                .map_or(true, |record| now - record.submission.completed_at < self.retention)
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} finalized sessions", evicted);
        }
        evicted
    }

    /// Tick every open session whose deadline has passed. Returns how many
    /// were finalized; failures are logged and retried on the next tick.
    /// Sessions past their retention window are evicted first.
    pub async fn tick_all(&self, now: DateTime<Utc>) -> usize {
        self.evict_finalized(now);

        let due: Vec<Arc<Session>> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.status() == SessionStatus::InProgress && s.is_expired(now))
            .cloned()
            .collect();

        if due.is_empty() {
            return 0;
        }

        let mut tasks = JoinSet::new();
        for session in due {
            let finalizer = Arc::clone(&self.finalizer);
            tasks.spawn(async move {
                let outcome = tick_session(&finalizer, &session, now).await;
                (session.id(), outcome)
            });
        }

        let mut finalized = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(TickOutcome::Finalized(_)))) => finalized += 1,
                Ok((_, Ok(TickOutcome::Running { .. }))) => {}
                Ok((id, Err(e))) => {
                    error!("Deadline finalize failed for session {}: {}", id, e);
                }
                Err(e) => error!("Tick task aborted: {}", e),
            }
        }
        finalized
    }

    /// Explicit submit. Repeated calls return the stored submission.
    pub async fn submit(&self, session_id: Uuid) -> Result<GradedSubmission> {
        let session = self.session(session_id)?;
        info!("Submit requested for session {}", session_id);
        self.finalizer.finalize(&session).await
    }

    pub fn result(&self, session_id: Uuid) -> Result<SessionResult> {
        let session = self.session(session_id)?;
        let record = session
            .record()
            .ok_or(EngineError::ResultPending(session_id))?;

        let coding = session
            .exam()
            .questions
            .iter()
            .filter_map(|question| {
                let QuestionKind::Coding { test_cases, .. } = &question.kind else {
                    return None;
                };
                let grade = record.coding.get(&question.id)?;
                Some(CodingResultView {
                    question_id: question.id.clone(),
                    passed: grade.passed,
                    total: grade.total,
                    earned: grade.earned,
                    marks: grade.marks,
                    results: grade.client_views(test_cases),
                })
            })
            .collect();

        Ok(SessionResult {
            submission: record.submission.clone(),
            coding,
        })
    }
}

async fn tick_session(
    finalizer: &SubmissionFinalizer,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<TickOutcome> {
    if let Some(record) = session.record() {
        return Ok(TickOutcome::Finalized(record.submission.clone()));
    }

    if !session.is_expired(now) {
        return Ok(TickOutcome::Running {
            remaining: session.remaining(now),
        });
    }

    info!("Deadline reached for session {}, finalizing", session.id());
    let submission = finalizer.finalize(session).await?;
    Ok(TickOutcome::Finalized(submission))
}
