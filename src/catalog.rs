//! Exam retrieval
//!
//! Exams are authored elsewhere. The engine only needs to look one up by id,
//! with hidden test cases intact so it can grade server-side.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::exam::ExamDefinition;

pub trait ExamCatalog: Send + Sync {
    fn get(&self, exam_id: &str) -> Option<Arc<ExamDefinition>>;
}

/// Catalog loaded once at startup from a JSON array of exams
#[derive(Debug, Default)]
pub struct FileExamCatalog {
    exams: HashMap<String, Arc<ExamDefinition>>,
}

impl FileExamCatalog {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read exams from {}", path.display()))?;
        let exams: Vec<ExamDefinition> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse exams from {}", path.display()))?;

        let catalog = Self::from_exams(exams)
            .with_context(|| format!("Invalid exam in {}", path.display()))?;
        info!("Loaded {} exams from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Build a catalog, validating every exam and rejecting duplicate ids
    pub fn from_exams(exams: impl IntoIterator<Item = ExamDefinition>) -> Result<Self> {
        let mut map = HashMap::new();
        for exam in exams {
            exam.validate()?;
            if map.contains_key(&exam.id) {
                return Err(EngineError::InvalidExam(format!(
                    "duplicate exam id {}",
                    exam.id
                )));
            }
            map.insert(exam.id.clone(), Arc::new(exam));
        }
        Ok(Self { exams: map })
    }

    pub fn len(&self) -> usize {
        self.exams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exams.is_empty()
    }
}

impl ExamCatalog for FileExamCatalog {
    fn get(&self, exam_id: &str) -> Option<Arc<ExamDefinition>> {
        self.exams.get(exam_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exam::fixtures::*;
    use std::io::Write;

    #[test]
    fn test_load_json_file() {
        let exams = vec![exam(
            30,
            vec![
                mcq("m1", 5, "B"),
                coding("c1", 10, &[("1, 2", "3", false), ("5, 5", "10", true)]),
            ],
        )];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&exams).unwrap().as_bytes())
            .unwrap();

        let catalog = FileExamCatalog::load(file.path()).unwrap();
        let exam = catalog.get("exam-1").unwrap();
        assert_eq!(exam.questions.len(), 2);
        assert_eq!(exam.duration_minutes, 30);
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_rejects_coding_question_without_tests() {
        let err = FileExamCatalog::from_exams(vec![exam(0, vec![coding("c1", 10, &[])])])
            .unwrap_err();
        assert!(matches!(err, EngineError::NoTestCases(id) if id == "c1"));
    }

    #[test]
    fn test_rejects_duplicate_exam_ids() {
        let err = FileExamCatalog::from_exams(vec![
            exam(0, vec![mcq("m1", 1, "A")]),
            exam(0, vec![mcq("m1", 1, "A")]),
        ])
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidExam(_)));
    }

    #[test]
    fn test_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        assert!(FileExamCatalog::load(file.path()).is_err());
    }

    #[test]
    fn test_bundled_exams_are_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/files/exams.json");
        let catalog = FileExamCatalog::load(path).unwrap();
        assert!(!catalog.is_empty());
    }
}
