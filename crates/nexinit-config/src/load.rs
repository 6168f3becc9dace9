//! Layered configuration loading.
//!
//! A base file is read first, then an optional overlay named by
//! `NEXUS_INIT_CONFIG_FILE` is deep-merged over it. The overlay is looked up in
//! the base file's directory and then in `NEXUS_INIT_CONFIG_PATH`.

use crate::{ConfigError, NexusConfig};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_CONFIG_PATH: &str = "NEXUS_INIT_CONFIG_PATH";
pub const ENV_CONFIG_FILE: &str = "NEXUS_INIT_CONFIG_FILE";

const BASE_CANDIDATES: [&str; 2] = ["config.json", "config.toml"];

/// Where the layers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSources {
    pub base: PathBuf,
    pub search_path: Option<PathBuf>,
    pub overlay: Option<String>,
}

impl ConfigSources {
    /// Resolve sources from an explicit base path (or `./config.{json,toml}`)
    /// and the process environment.
    pub fn from_env(base: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match base {
            Some(path) => path.to_path_buf(),
            None => find_base(Path::new("."))?,
        };
        Ok(Self {
            base,
            search_path: non_empty_env(ENV_CONFIG_PATH).map(PathBuf::from),
            overlay: non_empty_env(ENV_CONFIG_FILE),
        })
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self
            .base
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)];
        if let Some(extra) = &self.search_path {
            dirs.push(extra.clone());
        }
        dirs
    }

    fn find_overlay(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let file_name = if Path::new(name).extension().is_some() {
            name.to_owned()
        } else {
            format!("{name}.json")
        };
        let dirs = self.search_dirs();
        for dir in &dirs {
            let candidate = dir.join(&file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }
        Err(ConfigError::OverlayNotFound {
            name: file_name,
            searched: dirs.iter().map(|d| d.display().to_string()).collect(),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn find_base(dir: &Path) -> Result<PathBuf, ConfigError> {
    BASE_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            ConfigError::BaseNotFound(
                BASE_CANDIDATES
                    .iter()
                    .map(|n| dir.join(n).display().to_string())
                    .collect(),
            )
        })
}

/// Load, merge, type, and validate.
pub fn load(sources: &ConfigSources) -> Result<NexusConfig, ConfigError> {
    let mut tree = read_tree(&sources.base)?;
    debug!("loaded base config {}", sources.base.display());

    if let Some(name) = &sources.overlay {
        let path = sources.find_overlay(name)?;
        let overlay = read_tree(&path)?;
        merge_values(&mut tree, overlay);
        debug!("merged overlay config {}", path.display());
    }

    let config: NexusConfig =
        serde_json::from_value(tree).map_err(|source| ConfigError::ParseJson {
            path: sources.base.display().to_string(),
            source,
        })?;
    config.validate()?;
    Ok(config)
}

/// Load using `base` (or the default location) and the process environment.
pub fn load_from_env(base: Option<&Path>) -> Result<NexusConfig, ConfigError> {
    load(&ConfigSources::from_env(base)?)
}

fn read_tree(path: &Path) -> Result<Value, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    if path.extension().is_some_and(|ext| ext == "toml") {
        let value: toml::Value =
            toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
                path: path.display().to_string(),
                source,
            })?;
        serde_json::to_value(value).map_err(|source| ConfigError::ParseJson {
            path: path.display().to_string(),
            source,
        })
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::ParseJson {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Objects merge key by key; any other overlay value replaces the base value.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
