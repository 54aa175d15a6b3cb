use std::sync::OnceLock;

use regex::Regex;

use super::{first_name, HarnessShim};

#[derive(Debug, Clone, Default)]
pub struct PythonShim;

fn top_level_def() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^def\s+([A-Za-z_]\w*)\s*\(").expect("valid regex"))
}

fn class_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^class\s+([A-Za-z_]\w*)").expect("valid regex"))
}

fn method_def() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]+def\s+([A-Za-z]\w*)\s*\(\s*self\b").expect("valid regex")
    })
}

const SHIM: &str = r#"import json as __harness_json


def __harness_fmt(value):
    if value is None:
        return "null"
    if isinstance(value, bool):
        return "true" if value else "false"
    if isinstance(value, str):
        return value
    if isinstance(value, (list, tuple, dict, set, frozenset)):
        return __harness_json.dumps(value, separators=(",", ":"), default=list)
    return str(value)


__harness_ns = {"__name__": "__candidate__"}
"#;

impl HarnessShim for PythonShim {
    fn detect_entry(&self, source: &str) -> Option<String> {
        // `class Solution:` style submissions call a method on a fresh instance
        if let Some(class) = first_name(class_decl(), source, &[]) {
            if let Some(method) = first_name(method_def(), source, &["__init__"]) {
                return Some(format!("{}().{}", class, method));
            }
        }
        first_name(top_level_def(), source, &["main"])
    }

    /// The candidate runs in its own namespace under a non-`__main__` name,
    /// so an `if __name__ == "__main__":` block never runs. JSON string
    /// literals are valid Python string literals.
    fn wrap(&self, source: &str, entry: &str, input: &str) -> String {
        let source = serde_json::Value::from(source).to_string();
        let call = serde_json::Value::from(format!("{}({})", entry, input)).to_string();
        format!(
            "{SHIM}exec(compile({source}, \"main.py\", \"exec\"), __harness_ns)\n\
             print(__harness_fmt(eval({call}, __harness_ns)))\n"
        )
    }
}
