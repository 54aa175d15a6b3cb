//! Submission finalizer - the single place a session becomes final
//!
//! `finalize` is idempotent per session: the first caller grades, scores and
//! persists; every later or concurrent caller gets the stored result without
//! touching the sandbox again. Concurrent callers are serialized on the
//! session's result cell, and the status flip itself is a compare-and-swap
//! that is rolled back if grading or persistence fails.

pub mod redis_store;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::answers::{AnswerStore, AnswerValue};
use crate::error::{EngineError, Result, StoreError};
use crate::evaluator::{CodingGrade, Evaluator};
use crate::exam::{ExamDefinition, QuestionKind};
use crate::scoring::{self, GradedSubmission, ScoringInput};
use crate::session::Session;

pub use redis_store::RedisSubmissionStore;
pub use store::{MemorySubmissionStore, SubmissionStore};

/// What a finalized session keeps: the persisted submission plus the
/// per-test-case detail behind each coding score. The detail is empty when
/// another writer persisted the submission first.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedRecord {
    pub submission: GradedSubmission,
    pub coding: HashMap<String, CodingGrade>,
}

pub struct SubmissionFinalizer {
    evaluator: Arc<Evaluator>,
    store: Arc<dyn SubmissionStore>,
}

impl SubmissionFinalizer {
    pub fn new(evaluator: Arc<Evaluator>, store: Arc<dyn SubmissionStore>) -> Self {
        Self { evaluator, store }
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    /// Finalize `session`, or return the result of the finalize that already happened
    pub async fn finalize(&self, session: &Session) -> Result<GradedSubmission> {
        let record = self.finalize_record(session).await?;
        Ok(record.submission.clone())
    }

    pub async fn finalize_record<'a>(&self, session: &'a Session) -> Result<&'a FinalizedRecord> {
        session
            .finalized_cell()
            .get_or_try_init(|| self.finalize_once(session))
            .await
    }

    async fn finalize_once(&self, session: &Session) -> Result<FinalizedRecord> {
        let guard = session.begin_finalize()?;
        let answers = session.answers_snapshot();

        info!(
            "Finalizing session {} (exam={}, answered={}/{})",
            session.id(),
            session.exam().id,
            answers.len(),
            session.exam().questions.len()
        );

        let mut coding = self.grade_coding(session.exam(), &answers).await?;

        let mut submission = scoring::aggregate(ScoringInput {
            session_id: session.id(),
            taker_id: session.taker_id(),
            exam: session.exam(),
            answers: &answers,
            coding: &coding,
            completed_at: Utc::now(),
        })?;

        match self.store.insert(&submission).await {
            Ok(()) => {}
            Err(StoreError::AlreadyFinalized(id)) => {
                // Someone persisted this session before us (e.g. another
                // instance); the stored record wins. Our per-test-case detail
                // belongs to a different grading run, so it is dropped.
                warn!("Submission for session {} already persisted, reusing it", id);
                submission = self
                    .store
                    .get(id)
                    .await?
                    .ok_or_else(|| StoreError::Backend(format!("submission {} vanished", id)))?;
                coding.clear();
            }
            Err(e) => {
                error!("Failed to persist submission for session {}: {}", session.id(), e);
                return Err(e.into());
            }
        }

        guard.commit();

        info!(
            "Session finalized: session_id={}, earned={}/{}, percentage={}, passed={}",
            submission.session_id,
            submission.total_earned,
            submission.total_possible,
            submission.percentage,
            submission.passed
        );

        Ok(FinalizedRecord { submission, coding })
    }

    /// Grade every answered coding question, one task per question.
    /// Unanswered coding questions are not sent to the sandbox.
    async fn grade_coding(
        &self,
        exam: &ExamDefinition,
        answers: &AnswerStore,
    ) -> Result<HashMap<String, CodingGrade>> {
        let mut tasks = JoinSet::new();

        for question in &exam.questions {
            if !matches!(question.kind, QuestionKind::Coding { .. }) {
                continue;
            }
            let Some(AnswerValue::Coding(source)) = answers.get(&question.id) else {
                continue;
            };
            if source.trim().is_empty() {
                continue;
            }

            let evaluator = Arc::clone(&self.evaluator);
            let question = question.clone();
            let source = source.clone();
            tasks.spawn(async move {
                let result = evaluator.grade(&question, &source).await;
                (question.id, result)
            });
        }

        let mut grades = HashMap::new();
        let mut failure: Option<EngineError> = None;

        // Drain every task so no grading is left running behind our back
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((question_id, Ok(grade))) => {
                    grades.insert(question_id, grade);
                }
                Ok((question_id, Err(e))) => {
                    warn!("Grading failed for question {}: {}", question_id, e);
                    failure.get_or_insert(EngineError::GradingIncomplete {
                        question_id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    error!("Grading task aborted: {}", e);
                    failure.get_or_insert(EngineError::GradingIncomplete {
                        question_id: "<unknown>".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(grades),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::fixtures::*;
    use crate::languages::LanguageTable;
    use crate::sandbox::{SandboxConfig, SandboxOutcome};
    use crate::session::SessionStatus;
    use crate::testing::ScriptedSandbox;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ADD: &str = "def add(a, b):\n    return a + b\n";

    fn finalizer(
        sandbox: Arc<ScriptedSandbox>,
        store: Arc<MemorySubmissionStore>,
    ) -> SubmissionFinalizer {
        let evaluator = Evaluator::new(
            sandbox,
            Arc::new(LanguageTable::embedded().unwrap()),
            &SandboxConfig::default(),
        );
        SubmissionFinalizer::new(Arc::new(evaluator), store)
    }

    fn coding_session() -> Session {
        let exam = exam(
            0,
            vec![
                mcq("m1", 5, "B"),
                coding("c1", 10, &[("1, 2", "3", false), ("2, 2", "4", true)]),
            ],
        );
        let session = Session::start(Arc::new(exam), "taker", Utc::now()).unwrap();
        session
            .record_answer("m1", AnswerValue::MultipleChoice("B".into()))
            .unwrap();
        session
            .record_answer("c1", AnswerValue::Coding(ADD.into()))
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_sequential_finalize_is_idempotent() {
        let sandbox = ScriptedSandbox::adder(0);
        let store = Arc::new(MemorySubmissionStore::new());
        let finalizer = finalizer(sandbox.clone(), store.clone());
        let session = coding_session();

        let first = finalizer.finalize(&session).await.unwrap();
        let second = finalizer.finalize(&session).await.unwrap();

        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(first.percentage, 100);
        assert!(first.passed);
        assert_eq!(sandbox.calls(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(session.status(), SessionStatus::Finalized);
    }

    #[tokio::test]
    async fn test_concurrent_finalize_runs_once() {
        let sandbox = ScriptedSandbox::slow(Duration::from_millis(50), |_| {
            Ok(SandboxOutcome::success("3\n"))
        });
        let store = Arc::new(MemorySubmissionStore::new());
        let finalizer = Arc::new(finalizer(sandbox.clone(), store.clone()));
        let session = Arc::new(coding_session());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let finalizer = finalizer.clone();
            let session = session.clone();
            handles.push(tokio::spawn(async move {
                finalizer.finalize(&session).await.unwrap()
            }));
        }

        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(sandbox.calls(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_leaves_session_retryable() {
        let healthy = Arc::new(AtomicUsize::new(0));
        let flag = healthy.clone();
        let sandbox = ScriptedSandbox::new(move |_| {
            if flag.load(Ordering::SeqCst) == 0 {
                Err(EngineError::SandboxUnavailable("connection refused".into()))
            } else {
                Ok(SandboxOutcome::success("3\n"))
            }
        });
        let store = Arc::new(MemorySubmissionStore::new());
        let finalizer = finalizer(sandbox.clone(), store.clone());
        let session = coding_session();

        let err = finalizer.finalize(&session).await.unwrap_err();
        assert!(matches!(err, EngineError::GradingIncomplete { ref question_id, .. } if question_id == "c1"));
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(store.is_empty());

        healthy.store(1, Ordering::SeqCst);
        let submission = finalizer.finalize(&session).await.unwrap();
        assert_eq!(submission.per_question_score["c1"], 5);
        assert_eq!(session.status(), SessionStatus::Finalized);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_unanswered_coding_question_skips_sandbox() {
        let sandbox = ScriptedSandbox::adder(0);
        let store = Arc::new(MemorySubmissionStore::new());
        let finalizer = finalizer(sandbox.clone(), store);
        let exam = exam(0, vec![coding("c1", 10, &[("1, 2", "3", false)])]);
        let session = Session::start(Arc::new(exam), "taker", Utc::now()).unwrap();

        let submission = finalizer.finalize(&session).await.unwrap();
        assert_eq!(submission.total_earned, 0);
        assert_eq!(sandbox.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_conflict_reuses_persisted_submission() {
        let sandbox = ScriptedSandbox::adder(0);
        let store = Arc::new(MemorySubmissionStore::new());
        let session = coding_session();

        // Another instance got there first
        let mut earlier = finalizer(ScriptedSandbox::adder(1), store.clone())
            .finalize(&coding_session())
            .await
            .unwrap();
        earlier.session_id = session.id();
        store.insert(&earlier).await.unwrap();

        let record = finalizer(sandbox, store.clone())
            .finalize_record(&session)
            .await
            .unwrap();
        assert_eq!(record.submission, earlier);
        // Local test case detail came from a run that lost; none is reported
        assert!(record.coding.is_empty());
        assert_eq!(session.status(), SessionStatus::Finalized);
    }
}
