//! CLI configuration file and data directory resolution

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Contents of `keygate.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Directory holding the documents
    pub data_dir: Option<PathBuf>,
}

/// Read `path`; a missing file yields defaults, a malformed one is an error
pub fn load_config(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Failed to parse config file {}", path.display()))
}

/// Flag, then environment, then config file, then the working directory
pub fn resolve_data_dir(
    flag: Option<PathBuf>,
    env: Option<OsString>,
    config: &CliConfig,
) -> PathBuf {
    flag.or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}
