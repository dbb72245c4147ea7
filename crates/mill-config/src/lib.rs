//! Configuration management for the stylesheet upgrader
//!
//! This crate provides the upgrade settings (split layers and suffix, resolver
//! base directory, logging) and the tracing subscriber setup.

pub mod config;
pub mod logging;

pub use config::{
    ConfigError, LogFormat, LoggingConfig, ResolverConfig, SplitConfig, UpgradeConfig,
    CONFIG_FILE, ENV_PREFIX,
};
