//! Orderless override table.
//!
//! Some collections are declared `ordered-by user` in their schema although
//! the devices implementing them do not care about order. Listing them here
//! keeps the delta engine from emitting moves nobody needs.
//!
//! The table is data, loaded from YAML:
//!
//! ```yaml
//! paths:
//!   # exact data path; also covers everything below it
//!   - "/oc-sys:system/oc-sys:dns/oc-sys:servers/oc-sys:server"
//!   # glob pattern with an optional note
//!   - pattern: "/ios:native/ios:ip/ios:name-server/*"
//!     reason: stored sorted by the device
//! ```

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{DeltaError, ErrorContext, Result};

const BUILTIN_TABLE: &str = include_str!("builtin.yaml");

/// One entry of the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OrderlessEntry {
    /// Exact data path, e.g. `/if:interfaces/if:dns-server`
    Exact(String),

    /// Glob pattern (`*` any run of characters, `?` one character)
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// On-disk layout of a table file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OrderlessTableFile {
    #[serde(default)]
    pub paths: Vec<OrderlessEntry>,
}

/// Compiled set of orderless paths.
#[derive(Debug, Clone, Default)]
pub struct OrderlessTable {
    exact: HashSet<String>,
    patterns: Vec<(String, Regex)>,
}

impl OrderlessTable {
    /// Compile a table from entries.
    pub fn new(entries: &[OrderlessEntry]) -> Result<Self> {
        let mut table = Self::default();
        for entry in entries {
            match entry {
                OrderlessEntry::Exact(path) => {
                    table.exact.insert(path.trim_end_matches('/').to_string());
                }
                OrderlessEntry::Pattern { pattern, .. } => {
                    let regex = compile_glob(pattern).map_err(DeltaError::config)?;
                    table.patterns.push((pattern.clone(), regex));
                }
            }
        }
        Ok(table)
    }

    /// The curated table shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_TABLE).context("loading built-in orderless table")
    }

    /// Parse a table from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: OrderlessTableFile = serde_yaml_ng::from_str(yaml)?;
        Self::new(&file.paths)
    }

    /// Load a table from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeltaError::io(path, e))?;
        Self::from_yaml(&content).with_context(|| format!("loading {}", path.display()))
    }

    /// Add the entries of `other` to this table.
    pub fn extend(&mut self, other: Self) {
        self.exact.extend(other.exact);
        self.patterns.extend(other.patterns);
    }

    /// Whether the collection at `data_path` is order-insensitive.
    ///
    /// An exact entry covers its own path and every path below it; a pattern
    /// must match the whole path.
    #[must_use]
    pub fn contains(&self, data_path: &str) -> bool {
        let mut prefix = data_path;
        loop {
            if self.exact.contains(prefix) {
                return true;
            }
            match prefix.rfind('/') {
                Some(idx) if idx > 0 => prefix = &prefix[..idx],
                _ => break,
            }
        }
        self.patterns.iter().any(|(_, re)| re.is_match(data_path))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Convert a glob into an anchored regex.
pub(crate) fn compile_glob(pattern: &str) -> std::result::Result<Regex, String> {
    let regex_pattern = regex::escape(pattern)
        .replace("\\*", ".*")
        .replace("\\?", ".");

    Regex::new(&format!("^{regex_pattern}$"))
        .map_err(|e| format!("Invalid glob pattern '{pattern}': {e}"))
}
