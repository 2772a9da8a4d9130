//! Configuration validation for yang-delta.
//!
//! Provides validation traits and implementations for all configuration types.

use super::types::{AppConfig, DiffConfig, EncodingConfig, OrderlessConfig};
use crate::orderless::{OrderlessEntry, compile_glob};

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.orderless.validate());
        errors.extend(self.diff.validate());
        errors.extend(self.encoding.validate());
        errors
    }
}

impl Validatable for OrderlessConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (idx, entry) in self.entries.iter().enumerate() {
            match entry {
                OrderlessEntry::Exact(path) => {
                    if !path.starts_with('/') {
                        errors.push(ConfigError {
                            field: format!("orderless.entries[{idx}]"),
                            message: format!("Data path must be absolute, got '{path}'"),
                        });
                    }
                }
                OrderlessEntry::Pattern { pattern, .. } => {
                    if let Err(message) = compile_glob(pattern) {
                        errors.push(ConfigError {
                            field: format!("orderless.entries[{idx}].pattern"),
                            message,
                        });
                    }
                }
            }
        }

        for path in &self.files {
            if !path.exists() {
                errors.push(ConfigError {
                    field: "orderless.files".to_string(),
                    message: format!("Table file does not exist: {}", path.display()),
                });
            }
        }

        errors
    }
}

impl Validatable for DiffConfig {
    fn validate(&self) -> Vec<ConfigError> {
        Vec::new()
    }
}

impl Validatable for EncodingConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if !self.restconf_root.starts_with('/') {
            errors.push(ConfigError {
                field: "encoding.restconf_root".to_string(),
                message: format!(
                    "RESTCONF root must start with '/', got '{}'",
                    self.restconf_root
                ),
            });
        }

        if let Some(origin) = &self.gnmi_origin
            && origin.trim().is_empty()
        {
            errors.push(ConfigError {
                field: "encoding.gnmi_origin".to_string(),
                message: "Origin must not be empty; omit it instead".to_string(),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().is_valid());
    }

    #[test]
    fn test_relative_orderless_path() {
        let config = AppConfig::builder()
            .orderless_entry(OrderlessEntry::Exact("rt:routing".into()))
            .build();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "orderless.entries[0]");
    }

    #[test]
    fn test_missing_table_file() {
        let config = AppConfig {
            orderless: OrderlessConfig {
                files: vec![PathBuf::from("/nonexistent/orderless.yaml")],
                ..OrderlessConfig::default()
            },
            ..AppConfig::default()
        };
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "orderless.files"));
    }

    #[test]
    fn test_encoding_checks() {
        let config = AppConfig::builder()
            .restconf_root("restconf")
            .gnmi_origin(Some(" ".into()))
            .build();
        let fields: Vec<String> = config.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["encoding.restconf_root", "encoding.gnmi_origin"]);
    }
}
