use std::sync::OnceLock;

use regex::Regex;

use super::HarnessShim;

/// JavaScript shim; `typed` emits TypeScript annotations for the formatter
#[derive(Debug, Clone, Default)]
pub struct JavaScriptShim {
    pub typed: bool,
}

fn function_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^(?:export\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*[<(]|^(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::[^=]+)?=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*(?::[^=]+)?=>|[A-Za-z_$][\w$]*\s*=>)",
        )
        .expect("valid regex")
    })
}

impl HarnessShim for JavaScriptShim {
    fn detect_entry(&self, source: &str) -> Option<String> {
        function_decl()
            .captures_iter(source)
            .filter_map(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str())
            .find(|name| *name != "main")
            .map(str::to_string)
    }

    fn wrap(&self, source: &str, entry: &str, input: &str) -> String {
        let signature = if self.typed {
            "function __harnessFmt(value: unknown): string"
        } else {
            "function __harnessFmt(value)"
        };

        format!(
            r#"{source}

{signature} {{
  if (value === undefined || value === null) return "null";
  if (typeof value === "object") return JSON.stringify(value);
  return String(value);
}}

Promise.resolve({entry}({input})).then((value) => console.log(__harnessFmt(value)));
"#,
            source = source.trim_end(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_function_declaration() {
        let src = "function twoSum(nums, target) {\n  return [0, 1];\n}\n";
        assert_eq!(
            JavaScriptShim::default().detect_entry(src),
            Some("twoSum".into())
        );
    }

    #[test]
    fn test_detects_arrow_function() {
        let src = "const add = (a, b) => a + b;\n";
        assert_eq!(JavaScriptShim::default().detect_entry(src), Some("add".into()));

        let src = "const square = x => x * x;\n";
        assert_eq!(
            JavaScriptShim::default().detect_entry(src),
            Some("square".into())
        );
    }

    #[test]
    fn test_ignores_plain_constants() {
        let src = "const limit = 10;\nconsole.log(limit);\n";
        assert_eq!(JavaScriptShim::default().detect_entry(src), None);
    }

    #[test]
    fn test_typed_wrap_annotates_formatter() {
        let shim = JavaScriptShim { typed: true };
        let out = shim.wrap("function f(a: number): number { return a; }", "f", "3");
        assert!(out.contains("value: unknown"));
        assert!(out
            .trim_end()
            .ends_with("Promise.resolve(f(3)).then((value) => console.log(__harnessFmt(value)));"));
    }

    #[test]
    fn test_async_entry_is_awaited_before_printing() {
        let shim = JavaScriptShim::default();
        let src = "async function add(a, b) {\n  return a + b;\n}\n";
        assert_eq!(shim.detect_entry(src), Some("add".into()));

        let out = shim.wrap(src, "add", "1, 2");
        assert!(out.contains("Promise.resolve(add(1, 2)).then((value) =>"));
        assert!(!out.contains("console.log(__harnessFmt(add("));
    }
}
