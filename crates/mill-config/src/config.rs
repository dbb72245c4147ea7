//! Upgrade configuration.
//!
//! # Configuration Hierarchy
//!
//! Settings are resolved in the following order of precedence (highest to lowest):
//! 1. **Environment Variables**: `MILL_UPGRADE_*` (e.g., `MILL_UPGRADE_SPLIT__SUFFIX=extracted`)
//! 2. **Project Configuration**: `.mill/upgrade.toml` in the project root.
//! 3. **Default Values**: the `Default` impls below.
//!
//! # Configuration File Example
//!
//! ```toml
//! # .mill/upgrade.toml
//! [split]
//! layers = ["utilities"]
//! suffix = "utilities"
//!
//! [resolver]
//! base_dir = "/work/project/src"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location of the project configuration file, relative to the project root
pub const CONFIG_FILE: &str = ".mill/upgrade.toml";

/// Prefix for environment overrides; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "MILL_UPGRADE_";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpgradeConfig {
    pub split: SplitConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

/// Which sheets get their `@utility` rules moved into a sibling file
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    /// Cascade layers whose imported sheets are split
    pub layers: Vec<String>,
    /// `b.css` becomes `b.<suffix>.css`
    pub suffix: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            layers: vec!["utilities".to_string(), "components".to_string()],
            suffix: "utilities".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Directory relative imports of in-memory sheets resolve against.
    /// Defaults to the current working directory.
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Figment error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl UpgradeConfig {
    /// Load defaults, then `<project_root>/.mill/upgrade.toml`, then `MILL_UPGRADE_*`.
    /// A missing file is not an error.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(project_root.join(CONFIG_FILE)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        config.validate()?;
        tracing::debug!(
            project_root = %project_root.display(),
            split_layers = ?config.split.layers,
            split_suffix = %config.split.suffix,
            "Loaded upgrade configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let suffix = &self.split.suffix;
        if suffix.is_empty()
            || suffix.contains(|ch| ch == '/' || ch == '\\')
            || suffix.starts_with('.')
        {
            return Err(ConfigError::Invalid(format!(
                "split.suffix must be a plain file-name segment, got {:?}",
                suffix
            )));
        }
        if self.split.layers.iter().any(|layer| layer.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "split.layers must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }

    /// Base directory for resolving imports of sheets that have no file
    pub fn base_dir(&self) -> PathBuf {
        self.resolver
            .base_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = UpgradeConfig::default();
        assert_eq!(config.split.layers, vec!["utilities", "components"]);
        assert_eq!(config.split.suffix, "utilities");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let config = UpgradeConfig::load(jail.directory()).map_err(|e| e.to_string())?;
            assert_eq!(config, UpgradeConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file() {
        Jail::expect_with(|jail| {
            jail.create_dir(".mill")?;
            jail.create_file(
                ".mill/upgrade.toml",
                r#"
                [split]
                layers = ["utilities"]

                [logging]
                format = "json"
                "#,
            )?;

            let config = UpgradeConfig::load(jail.directory()).map_err(|e| e.to_string())?;
            assert_eq!(config.split.layers, vec!["utilities"]);
            // Untouched keys keep their defaults
            assert_eq!(config.split.suffix, "utilities");
            assert_eq!(config.logging.format, LogFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_dir(".mill")?;
            jail.create_file(
                ".mill/upgrade.toml",
                r#"
                [split]
                suffix = "from-file"
                "#,
            )?;
            jail.set_env("MILL_UPGRADE_SPLIT__SUFFIX", "from-env");
            jail.set_env("MILL_UPGRADE_LOGGING__LEVEL", "debug");

            let config = UpgradeConfig::load(jail.directory()).map_err(|e| e.to_string())?;
            assert_eq!(config.split.suffix, "from-env");
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_rejects_suffix_with_separator() {
        let mut config = UpgradeConfig::default();
        config.split.suffix = "nested/utilities".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.split.suffix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_file_is_reported() {
        Jail::expect_with(|jail| {
            jail.create_dir(".mill")?;
            jail.create_file(".mill/upgrade.toml", "[split]\nsuffix = \"../up\"\n")?;
            assert!(UpgradeConfig::load(jail.directory()).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_explicit_base_dir() {
        let mut config = UpgradeConfig::default();
        config.resolver.base_dir = Some(PathBuf::from("/work/styles"));
        assert_eq!(config.base_dir(), PathBuf::from("/work/styles"));
    }
}
