// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration: defaults < config file < environment < flags.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use kr_adapters::KubernetesConfig;
use serde::Deserialize;
use thiserror::Error;

/// Explicit config file path.
pub const CONFIG_ENV: &str = "KR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid {var}={value:?}: {reason}")]
    Env { var: &'static str, value: String, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Local,
    Lambda,
    Kubernetes,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    #[default]
    Kafka,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub pool_size: usize,
    pub broker: BrokerKind,
    pub bootstrap_servers: String,
    /// Seed data for the memory broker.
    pub fixture: Option<PathBuf>,
    pub timeout_ms: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            pool_size: 8,
            broker: BrokerKind::Kafka,
            bootstrap_servers: "localhost:9092".to_string(),
            fixture: None,
            timeout_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LambdaConfig {
    pub function_name: String,
    pub timeout_ms: u64,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self { function_name: "kr-worker".to_string(), timeout_ms: 60_000 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerKind,
    pub local: LocalConfig,
    pub lambda: LambdaConfig,
    pub kubernetes: KubernetesConfig,
}

impl Config {
    /// `$KR_CONFIG`, else `<config dir>/kr/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => dirs::config_dir().map(|dir| dir.join("kr").join("config.toml")),
        }
    }

    /// Load the config file (if any) and apply the environment.
    ///
    /// A missing default file means defaults; a missing `$KR_CONFIG` file
    /// is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).is_some();
        let mut config = match Self::default_path() {
            Some(path) if explicit || path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let mut config: Self = toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        // Relative fixture paths are relative to the config file.
        if let (Some(fixture), Some(dir)) = (&config.local.fixture, path.parent()) {
            if fixture.is_relative() {
                config.local.fixture = Some(dir.join(fixture));
            }
        }
        Ok(config)
    }

    /// Apply `KR_*` overrides read through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("KR_RUNNER") {
            self.runner = parse_enum("KR_RUNNER", value)?;
        }
        if let Some(value) = lookup("KR_BROKER") {
            self.local.broker = parse_enum("KR_BROKER", value)?;
        }
        if let Some(value) = lookup("KR_BOOTSTRAP_SERVERS") {
            self.local.bootstrap_servers = value;
        }
        if let Some(value) = lookup("KR_FIXTURE") {
            self.local.fixture = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup("KR_LAMBDA_FUNCTION") {
            self.lambda.function_name = value;
        }
        if let Some(value) = lookup("KR_K8S_NAMESPACE") {
            self.kubernetes.namespace = value;
        }
        if let Some(value) = lookup("KR_K8S_IMAGE") {
            self.kubernetes.image = value;
        }
        if let Some(value) = lookup("KR_TIMEOUT_MS") {
            let timeout_ms = value.parse::<u64>().map_err(|e| ConfigError::Env {
                var: "KR_TIMEOUT_MS",
                reason: e.to_string(),
                value,
            })?;
            self.local.timeout_ms = timeout_ms;
            self.lambda.timeout_ms = timeout_ms;
            self.kubernetes.timeout_ms = timeout_ms;
        }
        Ok(())
    }
}

fn parse_enum<T: ValueEnum>(var: &'static str, value: String) -> Result<T, ConfigError> {
    T::from_str(&value, true).map_err(|reason| ConfigError::Env { var, value, reason })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
