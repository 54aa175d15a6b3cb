//! Answer store: question id -> typed answer value

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::exam::{ExamDefinition, QuestionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Selected option string
    MultipleChoice(String),
    FreeText(String),
    /// Current source code
    Coding(String),
}

impl AnswerValue {
    pub fn as_str(&self) -> &str {
        match self {
            AnswerValue::MultipleChoice(s) | AnswerValue::FreeText(s) | AnswerValue::Coding(s) => s,
        }
    }

    fn matches(&self, kind: &QuestionKind) -> bool {
        matches!(
            (self, kind),
            (AnswerValue::MultipleChoice(_), QuestionKind::MultipleChoice { .. })
                | (AnswerValue::FreeText(_), QuestionKind::FreeText { .. })
                | (AnswerValue::Coding(_), QuestionKind::Coding { .. })
        )
    }
}

/// Answers recorded during one session. Keys are always question ids of the
/// exam the store was validated against.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerStore {
    answers: HashMap<String, AnswerValue>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the answer for `question_id` (last write wins).
    pub fn insert(
        &mut self,
        exam: &ExamDefinition,
        question_id: &str,
        value: AnswerValue,
    ) -> Result<()> {
        let question = exam
            .question(question_id)
            .ok_or_else(|| EngineError::UnknownQuestion(question_id.to_string()))?;

        if !value.matches(&question.kind) {
            return Err(EngineError::AnswerTypeMismatch {
                question_id: question_id.to_string(),
                expected: question.kind.type_name(),
            });
        }

        self.answers.insert(question_id.to_string(), value);
        Ok(())
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.answers.get(question_id)
    }

    pub fn answered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.answers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::fixtures::*;

    #[test]
    fn test_last_write_wins() {
        let exam = exam(0, vec![mcq("q1", 5, "B")]);
        let mut store = AnswerStore::new();

        store
            .insert(&exam, "q1", AnswerValue::MultipleChoice("A".into()))
            .unwrap();
        assert_eq!(
            store.get("q1"),
            Some(&AnswerValue::MultipleChoice("A".into()))
        );

        store
            .insert(&exam, "q1", AnswerValue::MultipleChoice("B".into()))
            .unwrap();
        assert_eq!(store.get("q1").map(|v| v.as_str()), Some("B"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_question_rejected() {
        let exam = exam(0, vec![mcq("q1", 5, "B")]);
        let mut store = AnswerStore::new();
        let err = store
            .insert(&exam, "nope", AnswerValue::FreeText("x".into()))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownQuestion(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let exam = exam(0, vec![free_text("essay", 5)]);
        let mut store = AnswerStore::new();
        let err = store
            .insert(&exam, "essay", AnswerValue::Coding("print(1)".into()))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::AnswerTypeMismatch { expected: "free_text", .. }
        ));
    }

    #[test]
    fn test_answer_value_wire_format() {
        let v: AnswerValue =
            serde_json::from_str(r#"{"type":"coding","value":"def f(): pass"}"#).unwrap();
        assert_eq!(v, AnswerValue::Coding("def f(): pass".into()));
    }
}
