// src/config.rs — NØN-OS Shell Configuration
// Maintained by ek@nonos-tech.xyz | © 2025 NØN Technologies
// TOML file + NONOSH_* environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::{resolver_for, CapabilityTokenService, COOKIE_NAME};

pub const CONFIG_PATH: &str = "/etc/nonos/nonosh.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{0}' not found")]
    NotFound(PathBuf),
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub shell: ShellConfig,
    pub capability: CapabilityConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub hostname: String,
    pub initial_user: String,
    pub history_limit: usize,
    pub balance: u64,
    /// Identity-provider subject the shell acts for when minting tokens.
    pub subject_id: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            hostname: "nonos".into(),
            initial_user: crate::auth::DEFAULT_USER.into(),
            history_limit: crate::shell::HISTORY_LIMIT,
            balance: 0,
            subject_id: "local-player".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub cookie_name: String,
    pub ttl_secs: u64,
    pub production: bool,
    pub secret: Option<String>,
    /// Other configured secret the signing key may be derived from outside
    /// production.
    pub fallback_material: Option<String>,
    pub unlock_route: String,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            cookie_name: COOKIE_NAME.into(),
            ttl_secs: 300,
            production: false,
            secret: None,
            fallback_material: None,
            unlock_route: "/panel".into(),
        }
    }
}

impl CapabilityConfig {
    pub fn build_service(&self) -> CapabilityTokenService {
        let resolver = resolver_for(self.secret.clone(), self.fallback_material.clone(), self.production);
        CapabilityTokenService::new(resolver)
            .with_cookie_name(&self.cookie_name)
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .secure(self.production)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub audit_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), audit_log: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for privilege/schedule snapshots; unset disables persistence.
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// Load `path`, or `CONFIG_PATH` when none is given. Only an explicit
    /// path is required to exist. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Self::from_file(p)?,
            None if Path::new(CONFIG_PATH).exists() => Self::from_file(Path::new(CONFIG_PATH))?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup("NONOSH_PANEL_SECRET") {
            self.capability.secret = Some(secret);
        }
        if let Some(material) = lookup("NONOSH_AUTH_SECRET") {
            self.capability.fallback_material = Some(material);
        }
        if let Some(env) = lookup("NONOSH_ENV") {
            self.capability.production = env.eq_ignore_ascii_case("production");
        }
    }
}
