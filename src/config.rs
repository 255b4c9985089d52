//! Application metadata with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults (`name` = application name, everything else empty)
//! 2. Global config: `$XDG_CONFIG_HOME/<app>/<app>.toml`
//! 3. Local config: `<dir>/.<app>.toml`
//! 4. Environment variables: `<APP>_*` prefix
//!
//! The dispatcher only reads `version` from this, at construction.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{DispatchError, DispatchResult};

/// Name, version and description of the hosting application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    /// Non-empty version registers the `help` command
    pub version: String,
    pub description: String,
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawAppConfig {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
}

fn config_err(e: ConfigError) -> DispatchError {
    DispatchError::Config {
        message: e.to_string(),
    }
}

/// Get the path to the global config file for `app_name`.
pub fn global_config_path(app_name: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", app_name)
        .map(|dirs| dirs.config_dir().join(format!("{app_name}.toml")))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!(".{app_name}.toml"))
}

fn load_raw(path: &Path) -> DispatchResult<RawAppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DispatchError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| DispatchError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl AppConfig {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawAppConfig) -> Self {
        Self {
            name: overlay.name.clone().unwrap_or_else(|| self.name.clone()),
            version: overlay
                .version
                .clone()
                .unwrap_or_else(|| self.version.clone()),
            description: overlay
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
        }
    }

    /// Load with layered precedence, see module docs.
    ///
    /// # Arguments
    /// * `app_name` - Names the config files and the env var prefix
    /// * `local_dir` - Optional directory holding `.<app_name>.toml`
    pub fn load(app_name: &str, local_dir: Option<&Path>) -> DispatchResult<Self> {
        let mut current = Self {
            name: app_name.to_string(),
            ..Self::default()
        };

        if let Some(global_path) = global_config_path(app_name) {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                current = current.merge_with(&load_raw(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir, app_name);
            if local_path.exists() {
                debug!("local config: {}", local_path.display());
                current = current.merge_with(&load_raw(&local_path)?);
            }
        }

        Self::apply_env_overrides(current, &env_prefix(app_name))
    }

    /// Apply `<PREFIX>_*` environment variables as explicit overrides.
    fn apply_env_overrides(mut cfg: Self, prefix: &str) -> DispatchResult<Self> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).prefix_separator("_"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("name") {
            cfg.name = val;
        }
        if let Ok(val) = config.get_string("version") {
            cfg.version = val;
        }
        if let Ok(val) = config.get_string("description") {
            cfg.description = val;
        }
        Ok(cfg)
    }
}

/// `my-app` → `MY_APP`
fn env_prefix(app_name: &str) -> String {
    app_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}
