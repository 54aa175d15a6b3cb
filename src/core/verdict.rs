use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of running one test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    CompileError,
    RuntimeError,
    WrongAnswer,
    Passed,
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::CompileError => "compile_error",
            Outcome::RuntimeError => "runtime_error",
            Outcome::WrongAnswer => "wrong_answer",
            Outcome::Passed => "passed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display_matches_serde() {
        for outcome in [
            Outcome::CompileError,
            Outcome::RuntimeError,
            Outcome::WrongAnswer,
            Outcome::Passed,
        ] {
            let json = serde_json::to_string(&outcome).unwrap();
            assert_eq!(json, format!("\"{}\"", outcome));
        }
    }
}
