//! Exam data model
//!
//! An `ExamDefinition` is authored elsewhere and handed to the engine fully
//! populated, hidden test cases included. Anything that leaves the engine
//! towards the exam taker goes through the `*View` projections below.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Identifier of a question, unique within its exam
pub type QuestionId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub id: String,
    pub title: String,
    /// Duration in minutes, 0 means untimed practice mode
    #[serde(default)]
    pub duration_minutes: u32,
    pub pass_threshold_percent: u32,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub marks: u32,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_option: String,
    },
    FreeText {
        /// Informational only, never auto-graded
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_answer: Option<String>,
    },
    Coding {
        language: String,
        #[serde(default)]
        starter_source: String,
        test_cases: Vec<TestCase>,
    },
}

impl QuestionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice { .. } => "multiple_choice",
            QuestionKind::FreeText { .. } => "free_text",
            QuestionKind::Coding { .. } => "coding",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub hidden: bool,
}

impl ExamDefinition {
    /// Check the invariants an exam must satisfy before a session can use it.
    pub fn validate(&self) -> Result<()> {
        if self.questions.is_empty() {
            return Err(EngineError::InvalidExam(format!(
                "exam {} has no questions",
                self.id
            )));
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(EngineError::InvalidExam(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
            if question.marks == 0 {
                return Err(EngineError::InvalidExam(format!(
                    "question {} must carry at least one mark",
                    question.id
                )));
            }
            match &question.kind {
                QuestionKind::MultipleChoice {
                    options,
                    correct_option,
                } => {
                    if !options.contains(correct_option) {
                        return Err(EngineError::InvalidExam(format!(
                            "question {}: correct option is not one of its options",
                            question.id
                        )));
                    }
                }
                QuestionKind::Coding { test_cases, .. } if test_cases.is_empty() => {
                    return Err(EngineError::NoTestCases(question.id.clone()));
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn total_marks(&self) -> u32 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    pub fn is_timed(&self) -> bool {
        self.duration_minutes > 0
    }
}

/// Question as shown to the exam taker
#[derive(Debug, Clone, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub index: usize,
    pub prompt: String,
    pub marks: u32,
    #[serde(flatten)]
    pub kind: QuestionKindView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKindView {
    MultipleChoice {
        options: Vec<String>,
    },
    FreeText,
    Coding {
        language: String,
        starter_source: String,
        sample_tests: Vec<TestCase>,
        hidden_test_count: usize,
    },
}

impl Question {
    /// Project the question for the exam taker: no correct option, no model
    /// answer, and hidden test cases reduced to a count.
    pub fn client_view(&self, index: usize) -> QuestionView {
        let kind = match &self.kind {
            QuestionKind::MultipleChoice { options, .. } => QuestionKindView::MultipleChoice {
                options: options.clone(),
            },
            QuestionKind::FreeText { .. } => QuestionKindView::FreeText,
            QuestionKind::Coding {
                language,
                starter_source,
                test_cases,
            } => {
                let (hidden, public): (Vec<&TestCase>, Vec<&TestCase>) =
                    test_cases.iter().partition(|tc| tc.hidden);
                QuestionKindView::Coding {
                    language: language.clone(),
                    starter_source: starter_source.clone(),
                    sample_tests: public.into_iter().cloned().collect(),
                    hidden_test_count: hidden.len(),
                }
            }
        };

        QuestionView {
            id: self.id.clone(),
            index,
            prompt: self.prompt.clone(),
            marks: self.marks,
            kind,
        }
    }
}
