//! Evaluator module for grading coding questions
//!
//! Runs a question's test cases one at a time through harness generation and
//! the sandbox, classifies every outcome and turns the pass ratio into marks.
//! Test cases run sequentially so a compile error stops further sandbox calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::Outcome;
use crate::error::{EngineError, Result};
use crate::exam::{Question, QuestionKind, TestCase};
use crate::harness;
use crate::languages::LanguageTable;
use crate::sandbox::{ExecutionRequest, SandboxConfig, SandboxExecutor, SandboxOutcome};

/// Longest stdout / diagnostic kept per test case
const MAX_CAPTURE_CHARS: usize = 4096;

/// Result of one test case, server-side (unredacted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub test_case_index: usize,
    pub outcome: Outcome,
    pub actual_output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Test case whose run produced `diagnostic`, when it was not this one.
    /// A compile error is reported on every remaining case, but its message
    /// quotes the harness of the case that triggered it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_from: Option<usize>,
}

/// Result of one test case as the exam taker may see it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResultView {
    pub test_case_index: usize,
    pub hidden: bool,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl ExecutionResult {
    /// Client-facing projection; hidden test cases keep only their outcome.
    /// A diagnostic is only shown when the case that produced it is public.
    pub fn client_view(&self, test_cases: &[TestCase]) -> Option<ExecutionResultView> {
        let test_case = test_cases.get(self.test_case_index)?;

        if test_case.hidden {
            return Some(ExecutionResultView {
                test_case_index: self.test_case_index,
                hidden: true,
                outcome: self.outcome,
                input: None,
                expected_output: None,
                actual_output: None,
                diagnostic: None,
            });
        }

        let origin = self.diagnostic_from.unwrap_or(self.test_case_index);
        let diagnostic = match test_cases.get(origin) {
            Some(source) if !source.hidden => self.diagnostic.clone(),
            _ => None,
        };

        Some(ExecutionResultView {
            test_case_index: self.test_case_index,
            hidden: false,
            outcome: self.outcome,
            input: Some(test_case.input.clone()),
            expected_output: Some(test_case.expected_output.clone()),
            actual_output: Some(self.actual_output.clone()),
            diagnostic,
        })
    }
}

/// Graded coding question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingGrade {
    pub question_id: String,
    pub results: Vec<ExecutionResult>,
    pub passed: usize,
    pub total: usize,
    pub marks: u32,
    pub earned: u32,
}

impl CodingGrade {
    fn from_results(question: &Question, results: Vec<ExecutionResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.outcome.is_passed()).count();
        Self {
            question_id: question.id.clone(),
            passed,
            total,
            marks: question.marks,
            earned: earned_marks(passed, total, question.marks),
            results,
        }
    }

    /// Per-test-case views for the exam taker, in test case order
    pub fn client_views(&self, test_cases: &[TestCase]) -> Vec<ExecutionResultView> {
        self.results
            .iter()
            .filter_map(|r| r.client_view(test_cases))
            .collect()
    }
}

/// round(passed / total * marks)
pub fn earned_marks(passed: usize, total: usize, marks: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((passed as f64 / total as f64) * marks as f64).round() as u32
}

/// Grades coding questions against the sandbox
pub struct Evaluator {
    sandbox: Arc<dyn SandboxExecutor>,
    languages: Arc<LanguageTable>,
    compile_timeout_ms: u64,
    run_timeout_ms: u64,
}

impl Evaluator {
    pub fn new(
        sandbox: Arc<dyn SandboxExecutor>,
        languages: Arc<LanguageTable>,
        config: &SandboxConfig,
    ) -> Self {
        Self {
            sandbox,
            languages,
            compile_timeout_ms: config.compile_timeout_ms,
            run_timeout_ms: config.run_timeout_ms,
        }
    }

    /// Grade `source` against every test case of a coding question.
    ///
    /// Execution problems are recorded per test case; only infrastructure
    /// failures (`SandboxUnavailable`, `UnsupportedLanguage`) and a question
    /// without test cases are returned as errors.
    pub async fn grade(&self, question: &Question, source: &str) -> Result<CodingGrade> {
        let QuestionKind::Coding {
            language,
            test_cases,
            ..
        } = &question.kind
        else {
            return Err(EngineError::MisconfiguredExam(format!(
                "question {} is not a coding question",
                question.id
            )));
        };

        if test_cases.is_empty() {
            return Err(EngineError::NoTestCases(question.id.clone()));
        }

        let runtime = self.languages.resolve(language)?;

        let mut results = Vec::with_capacity(test_cases.len());

        for (idx, tc) in test_cases.iter().enumerate() {
            let harness = harness::generate(runtime.language, source, &tc.input);
            let request = ExecutionRequest::new(runtime, harness.source)
                .with_stdin(harness.stdin)
                .with_timeouts(self.compile_timeout_ms, self.run_timeout_ms);

            let outcome = self.sandbox.execute(&request).await?;

            if let Some(message) = outcome.compile_error {
                // Compilation is a property of the whole submission
                let diagnostic = truncate(&message);
                warn!(
                    "Compile error for question {} at test case {}; skipping {} remaining",
                    question.id,
                    idx,
                    test_cases.len() - idx - 1
                );
                results.extend((idx..test_cases.len()).map(|i| ExecutionResult {
                    test_case_index: i,
                    outcome: Outcome::CompileError,
                    actual_output: String::new(),
                    diagnostic: Some(diagnostic.clone()),
                    diagnostic_from: (i != idx).then_some(idx),
                }));
                break;
            }

            let (verdict, diagnostic) = classify(&outcome, &tc.expected_output);
            results.push(ExecutionResult {
                test_case_index: idx,
                outcome: verdict,
                actual_output: truncate(&outcome.stdout),
                diagnostic,
                diagnostic_from: None,
            });
        }

        let grade = CodingGrade::from_results(question, results);

        info!(
            "Grading summary: question_id={}, language={}, passed={}/{}, earned={}/{}",
            question.id, runtime.language, grade.passed, grade.total, grade.earned, grade.marks
        );

        Ok(grade)
    }
}

/// Classify a run that compiled
fn classify(outcome: &SandboxOutcome, expected: &str) -> (Outcome, Option<String>) {
    if !outcome.stderr.is_empty() {
        return (Outcome::RuntimeError, Some(truncate(&outcome.stderr)));
    }
    if let Some(signal) = &outcome.signal {
        return (
            Outcome::RuntimeError,
            Some(format!("Terminated by {}", signal)),
        );
    }
    if let Some(code) = outcome.exit_code.filter(|c| *c != 0) {
        return (
            Outcome::RuntimeError,
            Some(format!("Exited with code {}", code)),
        );
    }

    let actual = outcome.stdout.trim_end();
    let expected = expected.trim_end();

    if actual.is_empty() && !expected.is_empty() {
        return (Outcome::RuntimeError, Some("No output produced".to_string()));
    }

    if actual == expected {
        (Outcome::Passed, None)
    } else {
        (Outcome::WrongAnswer, None)
    }
}

fn truncate(s: &str) -> String {
    s.chars().take(MAX_CAPTURE_CHARS).collect()
}
