//! Language configuration for sandbox execution
//!
//! `Language` is a closed set: each variant has a harness shim. Which sandbox
//! runtime and version serve a language is data, read from `files/languages.toml`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    Go,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Java,
        Language::Cpp,
        Language::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::Go => "go",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Language {
    type Err = EngineError;

    /// Parses canonical names only; aliases are resolved by `LanguageTable`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str() == s.to_lowercase())
            .ok_or_else(|| EngineError::UnsupportedLanguage(s.to_string()))
    }
}

/// Sandbox runtime selection for one language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageConfig {
    pub language: Language,
    /// Runtime name expected by the sandbox (e.g. "c++")
    pub runtime: String,
    /// Runtime version expected by the sandbox (e.g. "10.2.0")
    pub version: String,
    /// Name of the file the harness is submitted as
    pub source_file: String,
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    runtime: String,
    version: String,
    source_file: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Lookup table from language identifier (or alias) to runtime config
#[derive(Debug, Clone)]
pub struct LanguageTable {
    languages: HashMap<String, LanguageConfig>,
}

impl LanguageTable {
    /// Table shipped with the crate
    pub fn embedded() -> anyhow::Result<Self> {
        let content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));
        Self::from_toml(content).context("Invalid embedded languages.toml")
    }

    /// Load a table from a TOML file on disk
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid {}", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut languages = HashMap::new();

        for (name, raw) in raw_configs {
            let language: Language = name
                .parse()
                .map_err(|_| anyhow::anyhow!("No harness available for language {}", name))?;

            let config = LanguageConfig {
                language,
                runtime: raw.runtime,
                version: raw.version,
                source_file: raw.source_file,
            };

            // Add main language name
            languages.insert(name.to_lowercase(), config.clone());

            // Add aliases
            for alias in raw.aliases {
                languages.insert(alias.to_lowercase(), config.clone());
            }
        }

        Ok(Self { languages })
    }

    /// Resolve a language identifier from a question
    pub fn resolve(&self, language: &str) -> Result<&LanguageConfig, EngineError> {
        self.languages
            .get(&language.trim().to_lowercase())
            .ok_or_else(|| EngineError::UnsupportedLanguage(language.to_string()))
    }

    /// All identifiers the table answers to, aliases included
    pub fn supported_identifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.languages.keys().cloned().collect();
        names.sort();
        names
    }
}
