//! Harness module - wraps candidate code for a single test case
//!
//! A harness is the candidate's source plus a small per-language shim that
//! calls the detected entry function with the test input inlined as argument
//! literals and prints the return value on exactly one line.
//!
//! Entry-point detection is pluggable per language (`HarnessShim`). When no
//! entry can be detected the candidate source runs unmodified and the test
//! input is handed to it on stdin instead.
//!
//! The harness module does NOT:
//! - Execute anything (that's the sandbox client's job)
//! - Compare outputs

pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;

use regex::Regex;
use tracing::debug;

use crate::languages::Language;

/// How the harness reaches the candidate's code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Call expression target, e.g. `add` or `Solution().add`
    Call(String),
    /// No entry detected: the source runs as-is with input on stdin
    Raw,
}

/// Generated unit ready to be sent to the sandbox
#[derive(Debug, Clone)]
pub struct Harness {
    pub source: String,
    /// Only set for raw-source fallback
    pub stdin: Option<String>,
    pub entry: EntryPoint,
}

/// Per-language entry detection and wrapping
pub trait HarnessShim: Send + Sync {
    /// Find the call target for the candidate's entry function
    fn detect_entry(&self, source: &str) -> Option<String>;

    /// Wrap `source` so that it calls `entry(input)` and prints the result
    fn wrap(&self, source: &str, entry: &str, input: &str) -> String;
}

pub fn shim_for(language: Language) -> &'static dyn HarnessShim {
    match language {
        Language::Python => &python::PythonShim,
        Language::JavaScript => &javascript::JavaScriptShim { typed: false },
        Language::TypeScript => &javascript::JavaScriptShim { typed: true },
        Language::Java => &java::JavaShim,
        Language::Cpp => &cpp::CppShim,
        Language::Go => &go::GoShim,
    }
}

/// Build the harness for one test case
pub fn generate(language: Language, source: &str, input: &str) -> Harness {
    let shim = shim_for(language);

    match shim.detect_entry(source) {
        Some(entry) => {
            debug!("Detected {} entry point: {}", language, entry);
            Harness {
                source: shim.wrap(source, &entry, input.trim()),
                stdin: None,
                entry: EntryPoint::Call(entry),
            }
        }
        None => {
            debug!("No {} entry point detected, running raw source", language);
            Harness {
                source: source.to_string(),
                stdin: Some(input.to_string()),
                entry: EntryPoint::Raw,
            }
        }
    }
}

/// First capture of `re` in `source` whose name is not in `skip`
pub(crate) fn first_name(re: &Regex, source: &str, skip: &[&str]) -> Option<String> {
    re.captures_iter(source)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|name| !skip.contains(name))
        .map(str::to_string)
}

/// Control-flow keywords that method-declaration patterns can mistake for names
pub(crate) const C_FAMILY_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "else", "do", "sizeof",
    "synchronized",
];
