use std::fs;
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use ifupdown_core::ResolverPaths;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netconsole/netconsole.toml";

/// Console settings loaded from TOML.
///
/// ```toml
/// default_nic = "eth0"
///
/// [paths]
/// interfaces = "/etc/network/interfaces"
/// resolv_conf = "/etc/resolv.conf"
/// dhcp_state_dir = "/run/resolvconf/interface"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Adapter whose address the console treats as the appliance address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_nic: Option<String>,
    #[serde(skip_serializing_if = "PathsConfig::is_empty")]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolv_conf: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dhcp_state_dir: Option<PathBuf>,
}

impl PathsConfig {
    fn is_empty(&self) -> bool {
        self.interfaces.is_none() && self.resolv_conf.is_none() && self.dhcp_state_dir.is_none()
    }
}

/// Errors returned when loading the console config.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Errors returned when saving the console config.
#[derive(Debug, Error)]
pub enum ConfigSaveError {
    #[error("failed to serialize config: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("failed to write config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl ConsoleConfig {
    /// Resolver paths with config values over the built-in defaults.
    pub fn resolver_paths(&self) -> ResolverPaths {
        let defaults = ResolverPaths::default();
        ResolverPaths {
            interfaces: self.paths.interfaces.clone().unwrap_or(defaults.interfaces),
            dhcp_state_dir: self
                .paths
                .dhcp_state_dir
                .clone()
                .unwrap_or(defaults.dhcp_state_dir),
            resolv_conf: self.paths.resolv_conf.clone().unwrap_or(defaults.resolv_conf),
        }
    }
}

/// Load the config from `path`.
pub fn load_config(path: &Path) -> Result<ConsoleConfig, ConfigLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&raw, path.display().to_string())
}

/// Load an explicitly requested config, or the default one if it exists.
///
/// A missing explicit file is an error; a missing default file means
/// built-in defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConsoleConfig, ConfigLoadError> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    load_stored(Path::new(DEFAULT_CONFIG_PATH))
}

/// Load the config stored at `path`, treating a missing file as empty.
pub fn load_stored(path: &Path) -> Result<ConsoleConfig, ConfigLoadError> {
    match load_config(path) {
        Err(ConfigLoadError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            Ok(ConsoleConfig::default())
        }
        other => other,
    }
}

/// Atomically replace the config file at `path` with `config`.
pub fn save_config(config: &ConsoleConfig, path: &Path) -> Result<(), ConfigSaveError> {
    let text = toml::to_string(config)?;
    let io_err = |source| ConfigSaveError::Io {
        path: path.display().to_string(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::create_dir_all(dir).map_err(io_err)?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(text.as_bytes()).map_err(io_err)?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(io_err)?;
    }
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|err| io_err(err.error))?;

    info!(path = %path.display(), "saved console config");
    Ok(())
}

fn parse_config(raw: &str, path: String) -> Result<ConsoleConfig, ConfigLoadError> {
    toml::from_str(raw).map_err(|source| ConfigLoadError::Parse { path, source })
}
