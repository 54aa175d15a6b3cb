use std::sync::OnceLock;

use regex::Regex;

use super::{HarnessShim, C_FAMILY_KEYWORDS};

#[derive(Debug, Clone, Default)]
pub struct CppShim;

fn class_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(?:class|struct)\s+([A-Za-z_]\w*)").expect("valid regex"))
}

/// Function definition; group 1 is the indentation, group 2 the name
fn function_def() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^([ \t]*)(?:(?:static|inline|virtual|constexpr)[ \t]+)*[A-Za-z_][\w:<>, \t\*&]*?[ \t\*&]([A-Za-z_]\w*)[ \t]*\([^;{}]*\)\s*(?:const\s*)?\{",
        )
        .expect("valid regex")
    })
}

fn main_function() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bint\s+main\s*\(").expect("valid regex"))
}

const PRELUDE: &str = "#include <bits/stdc++.h>\n";

const SHIM: &str = r#"

namespace __harness {
std::string json(const std::string& v) {
    std::string out = "\"";
    for (char c : v) {
        if (c == '"' || c == '\\') out += '\\';
        out += c;
    }
    return out + "\"";
}
std::string json(const char* v) { return json(std::string(v)); }
std::string json(char v) { return json(std::string(1, v)); }
std::string json(bool v) { return v ? "true" : "false"; }
template <typename T>
typename std::enable_if<std::is_arithmetic<T>::value, std::string>::type json(T v) {
    std::ostringstream os;
    os << v;
    return os.str();
}
template <typename T> std::string json(const std::vector<T>& v);
template <typename K, typename V> std::string json(const std::map<K, V>& v);
template <typename K, typename V> std::string json(const std::unordered_map<K, V>& v);
template <typename A, typename B> std::string json(const std::pair<A, B>& v);
template <typename T> std::string json(const std::vector<T>& v) {
    std::string out = "[";
    bool first = true;
    for (const auto& item : v) {
        if (!first) out += ",";
        first = false;
        out += json(item);
    }
    return out + "]";
}
template <typename A, typename B> std::string json(const std::pair<A, B>& v) {
    return "[" + json(v.first) + "," + json(v.second) + "]";
}
template <typename M> std::string json_map(const M& v) {
    std::ostringstream key;
    std::string out = "{";
    bool first = true;
    for (const auto& kv : v) {
        if (!first) out += ",";
        first = false;
        key.str("");
        key << kv.first;
        out += json(key.str()) + ":" + json(kv.second);
    }
    return out + "}";
}
template <typename K, typename V> std::string json(const std::map<K, V>& v) { return json_map(v); }
template <typename K, typename V> std::string json(const std::unordered_map<K, V>& v) { return json_map(v); }

template <typename T> std::string fmt(const T& v) { return json(v); }
std::string fmt(const std::string& v) { return v; }
std::string fmt(const char* v) { return std::string(v); }
std::string fmt(char v) { return std::string(1, v); }
}

int main() {
"#;

impl HarnessShim for CppShim {
    fn detect_entry(&self, source: &str) -> Option<String> {
        if main_function().is_match(source) {
            return None;
        }

        let mut top_level = None;
        let mut member = None;
        for caps in function_def().captures_iter(source) {
            let (Some(indent), Some(name)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if C_FAMILY_KEYWORDS.contains(&name.as_str()) {
                continue;
            }
            if indent.as_str().is_empty() {
                top_level.get_or_insert(name.as_str());
            } else {
                member.get_or_insert(name.as_str());
            }
        }

        // LeetCode-style `class Solution { public: ... }` takes precedence
        let class = class_decl()
            .captures(source)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());
        match (class, member) {
            (Some(class), Some(method)) if method != class => {
                Some(format!("{}().{}", class, method))
            }
            _ => top_level.map(str::to_string),
        }
    }

    fn wrap(&self, source: &str, entry: &str, input: &str) -> String {
        format!(
            "{PRELUDE}{source}{SHIM}    std::cout << __harness::fmt({entry}({input})) << std::endl;\n    return 0;\n}}\n",
            source = source.trim_end(),
        )
    }
}
