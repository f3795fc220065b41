use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{error::HeliumError, session::SCHEMA_EXTENSION};

/// The project file the CLI looks for.
pub const CONFIG_FILE: &str = "heconfig.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Rust,
}

/// One code generation target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutput {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub path:      String,
    pub platform:  Platform,
}

/// The contents of `heconfig.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerConfig {
    #[serde(default)]
    pub version:    String,
    #[serde(default)]
    pub client_out: Vec<TargetOutput>,
    #[serde(default)]
    pub server_out: Vec<TargetOutput>,
    #[serde(default)]
    pub include:    Vec<String>,
    #[serde(default)]
    pub links:      HashMap<String, String>,
}

impl CompilerConfig {
    /// Parses and validates a project file.
    pub fn from_json(text: &str) -> Result<CompilerConfig, HeliumError> {
        let config: CompilerConfig = serde_json::from_str(text).map_err(|e| HeliumError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<CompilerConfig, HeliumError> {
        let text = fs::read_to_string(path).map_err(|e| HeliumError::Config(format!("{}: {}", path.display(), e)))?;
        CompilerConfig::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), HeliumError> {
        if self.client_out.is_empty() && self.server_out.is_empty() {
            return Err(HeliumError::Config("No output specified".to_owned()));
        }
        if self.include.is_empty() {
            return Err(HeliumError::Config("No source include specified".to_owned()));
        }
        for (target, _) in self.targets() {
            if target.namespace.is_empty() {
                return Err(HeliumError::Config("No namespace specified for output".to_owned()));
            }
            if target.path.is_empty() {
                return Err(HeliumError::Config("No path specified for output".to_owned()));
            }
        }
        Ok(())
    }

    /// Every output target with its client flag, client targets first.
    pub fn targets(&self) -> impl Iterator<Item = (&TargetOutput, bool)> {
        self.client_out
            .iter()
            .map(|target| (target, true))
            .chain(self.server_out.iter().map(|target| (target, false)))
    }
}

/// Translates an include pattern into a regex over `/`-separated paths
/// relative to the project directory. `**` spans directories, `*` and `?`
/// stay within one path segment.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, HeliumError> {
    let trimmed = pattern.trim_start_matches("./");
    let chars: Vec<char> = trimmed.chars().collect();
    let mut source = String::from("^");
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    source.push_str("(?:.*/)?");
                } else {
                    source.push_str(".*");
                }
            }
            '*' => source.push_str("[^/]*"),
            '?' => source.push_str("[^/]"),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }
    source.push('$');
    Regex::new(&source).map_err(|e| HeliumError::Config(format!("Invalid include pattern {}: {}", pattern, e)))
}

/// Finds the schema files under `project_dir` matching any of the include
/// patterns. The result is sorted and free of duplicates.
pub fn discover_sources(project_dir: &Path, include: &[String]) -> Result<Vec<PathBuf>, HeliumError> {
    let patterns = include
        .iter()
        .map(|pattern| glob_to_regex(pattern))
        .collect::<Result<Vec<_>, _>>()?;

    let mut found = BTreeSet::new();
    for entry in WalkDir::new(project_dir).follow_links(true) {
        let entry = entry.map_err(|e| HeliumError::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(SCHEMA_EXTENSION) {
            continue;
        }
        let relative = match path.strip_prefix(project_dir) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };
        if patterns.iter().any(|pattern| pattern.is_match(&relative)) {
            debug!("Including {}", path.display());
            found.insert(path.to_path_buf());
        }
    }
    Ok(found.into_iter().collect())
}
