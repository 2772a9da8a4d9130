//! Default configurations and presets for yang-delta.
//!
//! Provides named presets for common use cases and default values.

use super::types::{AppConfig, DiffConfig, EncodingConfig, OrderlessConfig};

/// Default RESTCONF data resource root.
pub const DEFAULT_RESTCONF_ROOT: &str = "/restconf/data";

/// Origin under which typed-update paths use unqualified names.
pub const DEFAULT_GNMI_ORIGIN: &str = "openconfig";

// ============================================================================
// Configuration Presets
// ============================================================================

/// Named configuration presets for common use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Built-in orderless table, default normalization
    Default,
    /// Every declared order is honored and explicit defaults are kept
    Strict,
    /// OpenConfig targets: unqualified typed-update paths
    OpenConfig,
}

impl ConfigPreset {
    /// Get the preset name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Strict => "strict",
            Self::OpenConfig => "openconfig",
        }
    }

    /// Parse a preset from a string name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::Default),
            "strict" | "exact" => Some(Self::Strict),
            "openconfig" | "oc" => Some(Self::OpenConfig),
            _ => None,
        }
    }

    /// Get a description of this preset.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Default => "Built-in orderless table and default-value normalization",
            Self::Strict => "Honor every declared order and treat explicit defaults as data",
            Self::OpenConfig => "Typed updates under the openconfig origin with unqualified names",
        }
    }

    /// Get all available presets.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Default, Self::Strict, Self::OpenConfig]
    }
}

impl std::fmt::Display for ConfigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Preset Implementations
// ============================================================================

impl AppConfig {
    /// Create an `AppConfig` from a named preset.
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::Strict => Self {
                orderless: OrderlessConfig {
                    builtin: false,
                    ..OrderlessConfig::default()
                },
                diff: DiffConfig {
                    normalize_defaults: false,
                },
                encoding: EncodingConfig::default(),
            },
            ConfigPreset::OpenConfig => Self {
                encoding: EncodingConfig {
                    gnmi_origin: Some(DEFAULT_GNMI_ORIGIN.to_string()),
                    ..EncodingConfig::default()
                },
                ..Self::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_round_trip() {
        for preset in ConfigPreset::all() {
            assert_eq!(ConfigPreset::from_name(preset.name()), Some(*preset));
        }
        assert_eq!(ConfigPreset::from_name("OC"), Some(ConfigPreset::OpenConfig));
        assert_eq!(ConfigPreset::from_name("unknown"), None);
    }

    #[test]
    fn test_strict_preset() {
        let config = AppConfig::from_preset(ConfigPreset::Strict);
        assert!(!config.orderless.builtin);
        assert!(!config.diff.normalize_defaults);
    }

    #[test]
    fn test_openconfig_preset() {
        let config = AppConfig::from_preset(ConfigPreset::OpenConfig);
        assert!(config.encoding.is_openconfig());
        assert!(config.orderless.builtin);
    }
}
