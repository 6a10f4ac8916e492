//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[allow(dead_code)]
pub enum ConfigError {
    #[error("Failed to load environment variables: {0}")]
    EnvLoad(#[from] dotenvy::Error),

    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Registry source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Path to the canonical agent registry (JSON)
    pub agents_path: PathBuf,
    /// Path to the constitutional lock registry (YAML)
    pub locks_path: PathBuf,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            agents_path: PathBuf::from("config/AGENT_REGISTRY.json"),
            locks_path: PathBuf::from("config/LOCK_REGISTRY.yaml"),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub registry: RegistryConfig,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let registry = RegistryConfig {
            agents_path: std::env::var("PACFLOW_AGENT_REGISTRY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| RegistryConfig::default().agents_path),
            locks_path: std::env::var("PACFLOW_LOCK_REGISTRY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| RegistryConfig::default().locks_path),
        };

        Ok(Self { registry })
    }
}
