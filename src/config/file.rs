//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::types::AppConfig;
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Standard config file names to search for.
const CONFIG_FILE_NAMES: &[&str] = &[
    ".yang-delta.yaml",
    ".yang-delta.yml",
    "yang-delta.yaml",
    "yang-delta.yml",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (~/.config/yang-delta/)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path
        && path.exists()
    {
        return Some(path.to_path_buf());
    }

    if let Ok(cwd) = std::env::current_dir()
        && let Some(path) = find_config_in_dir(&cwd)
    {
        return Some(path);
    }

    if let Some(git_root) = find_git_root()
        && let Some(path) = find_config_in_dir(&git_root)
    {
        return Some(path);
    }

    if let Some(config_dir) = dirs::config_dir()
        && let Some(path) = find_config_in_dir(&config_dir.join("yang-delta"))
    {
        return Some(path);
    }

    if let Some(home) = dirs::home_dir()
        && let Some(path) = find_config_in_dir(&home)
    {
        return Some(path);
    }

    None
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Find the git repository root by walking up the directory tree.
fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();

    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Error type for config file operations.
#[derive(Debug)]
pub enum ConfigFileError {
    /// File not found
    NotFound(PathBuf),
    /// IO error reading file
    Io(std::io::Error),
    /// YAML parsing error
    Parse(serde_yaml_ng::Error),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            Self::Io(e) => write!(f, "Failed to read config file: {e}"),
            Self::Parse(e) => write!(f, "Failed to parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigFileError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml_ng::Error> for ConfigFileError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::Parse(err)
    }
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml_ng::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence.
    ///
    /// Orderless entries and files accumulate; other settings are taken from
    /// `other` where it differs from the default.
    pub fn merge(&mut self, other: &Self) {
        let defaults = Self::default();

        if other.orderless.builtin != defaults.orderless.builtin {
            self.orderless.builtin = other.orderless.builtin;
        }
        for entry in &other.orderless.entries {
            if !self.orderless.entries.contains(entry) {
                self.orderless.entries.push(entry.clone());
            }
        }
        for file in &other.orderless.files {
            if !self.orderless.files.contains(file) {
                self.orderless.files.push(file.clone());
            }
        }

        if other.diff.normalize_defaults != defaults.diff.normalize_defaults {
            self.diff.normalize_defaults = other.diff.normalize_defaults;
        }

        if other.encoding.restconf_root != defaults.encoding.restconf_root {
            self.encoding.restconf_root.clone_from(&other.encoding.restconf_root);
        }
        if other.encoding.gnmi_origin.is_some() {
            self.encoding.gnmi_origin.clone_from(&other.encoding.gnmi_origin);
        }
        if other.encoding.pretty_xml {
            self.encoding.pretty_xml = true;
        }
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# yang-delta configuration
# Place this file at .yang-delta.yaml in your project root or ~/.config/yang-delta/

{}
",
        serde_yaml_ng::to_string(&example).unwrap_or_default()
    )
}

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_full_example_config() -> String {
    r#"# yang-delta configuration file
# =============================
#
# Place it at:
#   - .yang-delta.yaml in your project root
#   - ~/.config/yang-delta/yang-delta.yaml for global config

# Collections declared `ordered-by user` whose order the device ignores
orderless:
  # Load the curated table shipped with the library
  builtin: true
  # Exact data paths (covering everything below them) or glob patterns
  entries:
    - "/rt:routing/rt:prefix-set"
    # - pattern: "/acl:acls/*/acl:aces/acl:ace"
    #   reason: entries are renumbered by sequence
  # Extra table files with a top-level `paths:` list
  files: []

# Delta computation
diff:
  # A leaf equal to its schema default is the same as an absent leaf
  normalize_defaults: true

# Encoders
encoding:
  # Path prefix of RESTCONF data resources
  restconf_root: /restconf/data
  # Origin of typed-update paths; `openconfig` drops module qualifiers
  # gnmi_origin: openconfig
  # Indent edit-config documents
  pretty_xml: false
"#
    .to_string()
}

// ============================================================================
// Tests
// ============================================================================
