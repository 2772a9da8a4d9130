//! Configuration module for yang-delta.
//!
//! This module provides a unified configuration system with:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - Named presets for common targets
//! - YAML config file loading and discovery
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use yang_delta::config::{AppConfig, ConfigPreset};
//! use yang_delta::diff::DeltaEngine;
//!
//! let config = AppConfig::from_preset(ConfigPreset::OpenConfig);
//!
//! // Load from file
//! use yang_delta::config::file::load_or_default;
//! let (config, loaded_from) = load_or_default(None);
//! let engine = DeltaEngine::from_config(schema, &config)?;
//! ```
//!
//! # Configuration File
//!
//! Place a `.yang-delta.yaml` file in your project root or `~/.config/yang-delta/`:
//!
//! ```yaml
//! orderless:
//!   entries:
//!     - "/rt:routing/rt:prefix-set"
//! diff:
//!   normalize_defaults: true
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{ConfigPreset, DEFAULT_GNMI_ORIGIN, DEFAULT_RESTCONF_ROOT};
pub use types::{AppConfig, AppConfigBuilder, DiffConfig, EncodingConfig, OrderlessConfig};
pub use validation::{ConfigError, Validatable};

pub use file::{
    ConfigFileError, discover_config_file, generate_example_config, generate_full_example_config,
    load_config_file, load_or_default,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// This schema documents all configuration options that can be set in
/// `.yang-delta.yaml` config files.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
