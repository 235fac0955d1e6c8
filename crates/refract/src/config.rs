//! Engine configuration
//!
//! The only tunable today is the memory layout model used to compute type
//! sizes, alignments and field offsets. Because type descriptors are cached
//! for the lifetime of the process, the configuration is fixed the first time
//! any descriptor is derived.
//!
//! ## TOML Configuration
//!
//! ```toml
//! [layout]
//! pointer_width = 32   # 32 or 64, defaults to 64
//! ```

use std::path::Path;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading or installing a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Semantically invalid setting
    #[error("Invalid config: {0}")]
    ValidationError(String),

    /// A configuration is already in effect
    #[error("Config already installed; it must be installed before the first type is derived")]
    AlreadyInstalled,
}

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Memory layout model
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Memory layout model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Width of a machine pointer in bits (32 or 64)
    #[serde(default = "default_pointer_width")]
    pub pointer_width: u32,
}

fn default_pointer_width() -> u32 {
    64
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pointer_width: default_pointer_width(),
        }
    }
}

impl LayoutConfig {
    /// Size of a pointer-sized word in bytes
    pub fn word_size(&self) -> usize {
        (self.pointer_width / 8) as usize
    }

    /// Alignment of 8-byte scalars (int64, float64, complex128)
    pub fn wide_align(&self) -> usize {
        self.word_size().min(8)
    }
}

impl Config {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check settings for consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.layout.pointer_width {
            32 | 64 => Ok(()),
            other => Err(ConfigError::ValidationError(format!(
                "layout.pointer_width must be 32 or 64, got {}",
                other
            ))),
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Install the process-wide configuration.
///
/// Fails if a configuration is already in effect, which includes the
/// implicit default fixed by the first type derivation.
pub fn install(config: Config) -> Result<(), ConfigError> {
    config.validate()?;
    CONFIG.set(config).map_err(|_| ConfigError::AlreadyInstalled)?;
    tracing::debug!(config = ?current(), "installed reflect configuration");
    Ok(())
}

/// The configuration in effect (the default if none was installed)
pub fn current() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = Config::default();
        assert_eq!(config.layout.pointer_width, 64);
        assert_eq!(config.layout.word_size(), 8);
        assert_eq!(config.layout.wide_align(), 8);
    }

    #[test]
    fn test_load_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [layout]
            pointer_width = 32
            "#,
        )
        .unwrap();
        assert_eq!(config.layout.word_size(), 4);
        assert_eq!(config.layout.wide_align(), 4);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_pointer_width() {
        let err = Config::from_toml_str("[layout]\npointer_width = 16\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = Config::from_toml_str("[layout\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_install_after_first_use_fails() {
        let _ = current();
        assert!(matches!(
            install(Config::default()),
            Err(ConfigError::AlreadyInstalled)
        ));
    }
}
