//! Configuration types for yang-delta.
//!
//! Provides structured configuration for the delta engine, the orderless
//! override table and the encoders.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::{DEFAULT_GNMI_ORIGIN, DEFAULT_RESTCONF_ROOT};
use crate::error::{ErrorContext, Result};
use crate::orderless::{OrderlessEntry, OrderlessTable};

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified configuration, loadable from a YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Collections whose declared order is ignored
    pub orderless: OrderlessConfig,
    /// Delta computation settings
    pub diff: DiffConfig,
    /// Encoder settings
    pub encoding: EncodingConfig,
}

impl AppConfig {
    /// Create a new `AppConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Load the table shipped with the crate.
    pub const fn builtin_orderless(mut self, enabled: bool) -> Self {
        self.config.orderless.builtin = enabled;
        self
    }

    /// Add an inline orderless entry.
    pub fn orderless_entry(mut self, entry: OrderlessEntry) -> Self {
        self.config.orderless.entries.push(entry);
        self
    }

    /// Add an orderless table file.
    pub fn orderless_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.orderless.files.push(path.into());
        self
    }

    /// Treat leaves holding their schema default as absent.
    pub const fn normalize_defaults(mut self, enabled: bool) -> Self {
        self.config.diff.normalize_defaults = enabled;
        self
    }

    /// Set the RESTCONF data resource root.
    pub fn restconf_root(mut self, root: impl Into<String>) -> Self {
        self.config.encoding.restconf_root = root.into();
        self
    }

    /// Set the origin of typed-update paths.
    pub fn gnmi_origin(mut self, origin: Option<String>) -> Self {
        self.config.encoding.gnmi_origin = origin;
        self
    }

    /// Indent rendered XML.
    pub const fn pretty_xml(mut self, pretty: bool) -> Self {
        self.config.encoding.pretty_xml = pretty;
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Orderless Configuration
// ============================================================================

/// Sources of the orderless override table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OrderlessConfig {
    /// Load the curated table shipped with the crate
    pub builtin: bool,
    /// Inline entries: exact data paths or `{ pattern, reason }` globs
    pub entries: Vec<OrderlessEntry>,
    /// Additional YAML table files
    pub files: Vec<PathBuf>,
}

impl Default for OrderlessConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            entries: Vec::new(),
            files: Vec::new(),
        }
    }
}

impl OrderlessConfig {
    /// Combine every configured source into one table.
    pub fn load_table(&self) -> Result<OrderlessTable> {
        let mut table = if self.builtin {
            OrderlessTable::builtin()?
        } else {
            OrderlessTable::default()
        };
        table.extend(OrderlessTable::new(&self.entries).context("inline orderless entries")?);
        for path in &self.files {
            table.extend(OrderlessTable::from_file(path)?);
        }
        tracing::debug!(entries = table.len(), "loaded orderless table");
        Ok(table)
    }
}

// ============================================================================
// Diff Configuration
// ============================================================================

/// Delta computation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DiffConfig {
    /// A leaf equal to its schema default is the same as an absent leaf
    pub normalize_defaults: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            normalize_defaults: true,
        }
    }
}

// ============================================================================
// Encoding Configuration
// ============================================================================

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EncodingConfig {
    /// Path prefix of RESTCONF data resources
    pub restconf_root: String,
    /// Origin of typed-update paths; `openconfig` drops module qualifiers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gnmi_origin: Option<String>,
    /// Indent edit-config documents
    pub pretty_xml: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            restconf_root: DEFAULT_RESTCONF_ROOT.to_string(),
            gnmi_origin: None,
            pretty_xml: false,
        }
    }
}

impl EncodingConfig {
    /// Whether typed-update paths use unqualified OpenConfig names.
    #[must_use]
    pub fn is_openconfig(&self) -> bool {
        self.gnmi_origin.as_deref() == Some(DEFAULT_GNMI_ORIGIN)
    }
}
