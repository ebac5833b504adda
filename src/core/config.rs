//! Workspace configuration loaded from `.registro/config.toml`.

use crate::core::error::RegistroError;
use crate::core::store::WORKSPACE_DIR;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_actor() -> String {
    "registro-cli".to_string()
}

fn default_write_retry_attempts() -> u32 {
    5
}

fn default_list_limit() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistroConfig {
    /// Actor recorded on broker audit events for CLI-invoked mutations.
    #[serde(default = "default_actor")]
    pub actor: String,
    /// Bounded attempt count before a contended write surfaces `Conflict`.
    #[serde(default = "default_write_retry_attempts")]
    pub write_retry_attempts: u32,
    /// Default page size for facade listings.
    #[serde(default = "default_list_limit")]
    pub list_limit: u32,
}

impl Default for RegistroConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
            write_retry_attempts: default_write_retry_attempts(),
            list_limit: default_list_limit(),
        }
    }
}

/// Load config from `<root>/.registro/config.toml`. A missing file is not
/// an error; every field has a default.
pub fn load_config(root: &Path) -> Result<RegistroConfig, RegistroError> {
    let config_path = root.join(WORKSPACE_DIR).join("config.toml");
    if !config_path.exists() {
        return Ok(RegistroConfig::default());
    }
    let content = fs::read_to_string(&config_path).map_err(RegistroError::IoError)?;
    let config: RegistroConfig =
        toml::from_str(&content).map_err(|e| RegistroError::ValidationError(e.to_string()))?;
    Ok(config)
}

/// Default config file written by `registro init`.
pub fn default_config_toml() -> String {
    let config = RegistroConfig::default();
    toml::to_string_pretty(&config).unwrap_or_default()
}
