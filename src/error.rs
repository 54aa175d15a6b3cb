//! Error taxonomy for the assessment engine
//!
//! Errors fall into four groups:
//! - configuration errors (exam setup is broken, never retried)
//! - client usage errors (recoverable, reported to the caller)
//! - infrastructure errors (transient, the caller decides whether to retry)
//! - lookups for the HTTP surface (unknown session / exam)
//!
//! Per-test-case execution problems (compile error, runtime error, wrong answer)
//! are NOT errors; they are recorded as `Outcome` data by the evaluator.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Exam cannot be used to start a session
    #[error("Invalid exam: {0}")]
    InvalidExam(String),

    /// Exam is structurally valid but cannot be scored (e.g. zero total marks)
    #[error("Misconfigured exam: {0}")]
    MisconfiguredExam(String),

    /// Coding question reached grading without test cases
    #[error("Coding question {0} has no test cases")]
    NoTestCases(String),

    #[error("Question index {index} out of range (exam has {len} questions)")]
    OutOfRange { index: usize, len: usize },

    #[error("Question {0} is not part of this exam")]
    UnknownQuestion(String),

    #[error("Answer for question {question_id} must be {expected}")]
    AnswerTypeMismatch {
        question_id: String,
        expected: &'static str,
    },

    #[error("Session is already finalized")]
    SessionFinalized,

    #[error("Sandbox unavailable: {0}")]
    SandboxUnavailable(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Finalize could not grade every coding question; status was not flipped
    #[error("Grading incomplete for question {question_id}: {reason}")]
    GradingIncomplete { question_id: String, reason: String },

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Exam {0} not found")]
    ExamNotFound(String),

    /// Result requested before the session was finalized
    #[error("Session {0} has not been finalized yet")]
    ResultPending(Uuid),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

impl EngineError {
    /// Stable machine-readable name, used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidExam(_) => "invalid_exam",
            EngineError::MisconfiguredExam(_) => "misconfigured_exam",
            EngineError::NoTestCases(_) => "no_test_cases",
            EngineError::OutOfRange { .. } => "out_of_range",
            EngineError::UnknownQuestion(_) => "unknown_question",
            EngineError::AnswerTypeMismatch { .. } => "answer_type_mismatch",
            EngineError::SessionFinalized => "session_finalized",
            EngineError::SandboxUnavailable(_) => "sandbox_unavailable",
            EngineError::UnsupportedLanguage(_) => "unsupported_language",
            EngineError::GradingIncomplete { .. } => "grading_incomplete",
            EngineError::SessionNotFound(_) => "session_not_found",
            EngineError::ExamNotFound(_) => "exam_not_found",
            EngineError::ResultPending(_) => "result_pending",
            EngineError::Persistence(_) => "persistence",
        }
    }

    /// Infrastructure errors are worth retrying; everything else is not
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::SandboxUnavailable(_)
                | EngineError::GradingIncomplete { .. }
                | EngineError::Persistence(StoreError::Backend(_))
        )
    }
}

/// Errors raised by a `SubmissionStore`
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Submission for session {0} already persisted")]
    AlreadyFinalized(Uuid),

    #[error("Storage backend failure: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
