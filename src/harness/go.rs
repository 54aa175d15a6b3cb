use std::sync::OnceLock;

use regex::Regex;

use super::{first_name, HarnessShim};

#[derive(Debug, Clone, Default)]
pub struct GoShim;

/// Top-level functions only; methods have a receiver and don't match
fn func_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^func\s+([A-Za-z_]\w*)\s*[\[(]").expect("valid regex"))
}

fn package_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^package\s+\w+[ \t]*\n?").expect("valid regex"))
}

impl HarnessShim for GoShim {
    fn detect_entry(&self, source: &str) -> Option<String> {
        let names: Vec<&str> = func_decl()
            .captures_iter(source)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect();
        if names.contains(&"main") {
            return None;
        }
        first_name(func_decl(), source, &["init"])
    }

    fn wrap(&self, source: &str, entry: &str, input: &str) -> String {
        // Our imports must precede the candidate's; Go allows several import
        // declarations as long as they all come before other declarations.
        let body = package_clause().replace(source, "");

        format!(
            r#"package main

import (
	harnessjson "encoding/json"
	harnessfmt "fmt"
)

{body}

func harnessFormat(value interface{{}}) string {{
	if value == nil {{
		return "null"
	}}
	switch v := value.(type) {{
	case string:
		return v
	case bool, int, int8, int16, int32, int64, uint, uint8, uint16, uint32, uint64, float32, float64:
		return harnessfmt.Sprint(v)
	}}
	encoded, err := harnessjson.Marshal(value)
	if err != nil {{
		return harnessfmt.Sprint(value)
	}}
	return string(encoded)
}}

func main() {{
	harnessfmt.Println(harnessFormat({entry}({input})))
}}
"#,
            body = body.trim(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_function_and_skips_methods() {
        let src = "package main\n\ntype S struct{}\n\nfunc (s S) helper() int { return 1 }\n\nfunc Sum(nums []int) int {\n\treturn 0\n}\n";
        assert_eq!(GoShim.detect_entry(src), Some("Sum".into()));
    }

    #[test]
    fn test_program_with_main_is_raw() {
        let src = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(1)\n}\n";
        assert_eq!(GoShim.detect_entry(src), None);
    }

    #[test]
    fn test_wrap_replaces_package_clause() {
        let src = "package solution\n\nimport \"strings\"\n\nfunc Upper(s string) string {\n\treturn strings.ToUpper(s)\n}\n";
        let out = GoShim.wrap(src, "Upper", "\"go\"");
        assert!(out.starts_with("package main\n"));
        assert!(!out.contains("package solution"));
        let ours = out.find("harnessjson \"encoding/json\"").unwrap();
        let theirs = out.find("import \"strings\"").unwrap();
        assert!(ours < theirs);
        assert!(out.contains("harnessFormat(Upper(\"go\"))"));
    }
}
