//! Scoring aggregator: per-question marks -> weighted total and verdict

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::answers::{AnswerStore, AnswerValue};
use crate::error::{EngineError, Result};
use crate::evaluator::CodingGrade;
use crate::exam::{ExamDefinition, QuestionKind};

/// Final, persisted result of one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSubmission {
    pub session_id: Uuid,
    pub exam_id: String,
    pub taker_id: String,
    /// question id -> earned marks (ordered for stable serialization)
    pub per_question_score: BTreeMap<String, u32>,
    /// Free-text questions awaiting a human grader; counted as zero here
    pub pending_manual_review: Vec<String>,
    pub total_earned: u32,
    pub total_possible: u32,
    pub percentage: u32,
    pub passed: bool,
    pub completed_at: DateTime<Utc>,
}

/// Everything the aggregator needs about one session
pub struct ScoringInput<'a> {
    pub session_id: Uuid,
    pub taker_id: &'a str,
    pub exam: &'a ExamDefinition,
    pub answers: &'a AnswerStore,
    /// Grades for the coding questions that were answered
    pub coding: &'a HashMap<String, CodingGrade>,
    pub completed_at: DateTime<Utc>,
}

pub fn aggregate(input: ScoringInput<'_>) -> Result<GradedSubmission> {
    let exam = input.exam;
    let total_possible = exam.total_marks();
    if total_possible == 0 {
        return Err(EngineError::MisconfiguredExam(format!(
            "exam {} has zero total marks",
            exam.id
        )));
    }

    let mut per_question_score = BTreeMap::new();
    let mut pending_manual_review = Vec::new();

    for question in &exam.questions {
        let earned = match &question.kind {
            QuestionKind::MultipleChoice { correct_option, .. } => {
                match input.answers.get(&question.id) {
                    Some(AnswerValue::MultipleChoice(selected)) if selected == correct_option => {
                        question.marks
                    }
                    _ => 0,
                }
            }
            QuestionKind::FreeText { .. } => {
                pending_manual_review.push(question.id.clone());
                0
            }
            QuestionKind::Coding { .. } => input
                .coding
                .get(&question.id)
                .map(|g| g.earned.min(question.marks))
                .unwrap_or(0),
        };
        per_question_score.insert(question.id.clone(), earned);
    }

    let total_earned: u32 = per_question_score.values().sum();
    let percentage = (100.0 * total_earned as f64 / total_possible as f64).round() as u32;

    Ok(GradedSubmission {
        session_id: input.session_id,
        exam_id: exam.id.clone(),
        taker_id: input.taker_id.to_string(),
        per_question_score,
        pending_manual_review,
        total_earned,
        total_possible,
        percentage,
        passed: percentage >= exam.pass_threshold_percent,
        completed_at: input.completed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::earned_marks;
    use crate::exam::fixtures::*;

    fn coding_grade(id: &str, passed: usize, total: usize, marks: u32) -> CodingGrade {
        CodingGrade {
            question_id: id.into(),
            results: vec![],
            passed,
            total,
            marks,
            earned: earned_marks(passed, total, marks),
        }
    }

    fn score(
        exam: &ExamDefinition,
        answers: &AnswerStore,
        coding: &HashMap<String, CodingGrade>,
    ) -> Result<GradedSubmission> {
        aggregate(ScoringInput {
            session_id: Uuid::nil(),
            taker_id: "taker",
            exam,
            answers,
            coding,
            completed_at: Utc::now(),
        })
    }

    #[test]
    fn test_full_marks_scenario() {
        let exam = exam(0, vec![mcq("m1", 5, "B"), coding("c1", 10, &[])]);
        let mut answers = AnswerStore::new();
        answers
            .insert(&exam, "m1", AnswerValue::MultipleChoice("B".into()))
            .unwrap();
        let coding = HashMap::from([("c1".to_string(), coding_grade("c1", 2, 2, 10))]);

        let result = score(&exam, &answers, &coding).unwrap();
        assert_eq!(result.total_earned, 15);
        assert_eq!(result.percentage, 100);
        assert!(result.passed);
    }

    #[test]
    fn test_partial_scenario() {
        let exam = exam(0, vec![mcq("m1", 5, "B"), coding("c1", 10, &[])]);
        let mut answers = AnswerStore::new();
        answers
            .insert(&exam, "m1", AnswerValue::MultipleChoice("A".into()))
            .unwrap();
        let coding = HashMap::from([("c1".to_string(), coding_grade("c1", 1, 2, 10))]);

        let result = score(&exam, &answers, &coding).unwrap();
        assert_eq!(result.per_question_score["m1"], 0);
        assert_eq!(result.per_question_score["c1"], 5);
        assert_eq!(result.total_earned, 5);
        assert_eq!(result.total_possible, 15);
        assert_eq!(result.percentage, 33);
        assert!(!result.passed);
    }

    #[test]
    fn test_free_text_is_pending_and_zero() {
        let exam = exam(0, vec![free_text("essay", 10), mcq("m1", 10, "C")]);
        let mut answers = AnswerStore::new();
        answers
            .insert(&exam, "essay", AnswerValue::FreeText("Borrowing...".into()))
            .unwrap();
        answers
            .insert(&exam, "m1", AnswerValue::MultipleChoice("C".into()))
            .unwrap();

        let result = score(&exam, &answers, &HashMap::new()).unwrap();
        assert_eq!(result.pending_manual_review, vec!["essay".to_string()]);
        assert_eq!(result.per_question_score["essay"], 0);
        assert_eq!(result.percentage, 50);
    }

    #[test]
    fn test_unanswered_scores_zero() {
        let exam = exam(0, vec![mcq("m1", 5, "B"), coding("c1", 5, &[])]);
        let result = score(&exam, &AnswerStore::new(), &HashMap::new()).unwrap();
        assert_eq!(result.total_earned, 0);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
    }

    #[test]
    fn test_zero_total_marks_is_misconfigured() {
        let exam = exam(0, vec![mcq("m1", 0, "B")]);
        let err = score(&exam, &AnswerStore::new(), &HashMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::MisconfiguredExam(_)));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut exam = exam(0, vec![mcq("m1", 7, "A"), mcq("m2", 3, "A")]);
        exam.pass_threshold_percent = 70;
        let mut answers = AnswerStore::new();
        answers
            .insert(&exam, "m1", AnswerValue::MultipleChoice("A".into()))
            .unwrap();

        let result = score(&exam, &answers, &HashMap::new()).unwrap();
        assert_eq!(result.percentage, 70);
        assert!(result.passed);
    }
}
