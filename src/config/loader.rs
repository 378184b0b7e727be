//! Configuration file discovery and loading.

use crate::config::schema::SieveConfig;
use crate::error::{Result, SieveError};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding configuration, under the home directory or the project.
pub const CONFIG_DIR: &str = ".recipe-sieve";

/// Configuration file name.
pub const CONFIG_FILE: &str = "config.yml";

/// Paths to configuration files in priority order (later overrides earlier).
///
/// Merge order:
/// 1. User global config (`~/.recipe-sieve/config.yml`)
/// 2. Project config (`.recipe-sieve/config.yml`)
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// User's global config
    pub user_global: Option<PathBuf>,

    /// Project config
    pub project: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given project root.
    pub fn discover(project_root: &Path) -> Self {
        Self::discover_with_home(dirs::home_dir().as_deref(), project_root)
    }

    /// Discover config files using an explicit home directory.
    pub fn discover_with_home(home: Option<&Path>, project_root: &Path) -> Self {
        Self {
            user_global: home.and_then(existing_config),
            project: existing_config(project_root),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.user_global.iter().chain(self.project.iter()).collect()
    }
}

fn existing_config(root: &Path) -> Option<PathBuf> {
    let path = root.join(CONFIG_DIR).join(CONFIG_FILE);
    path.exists().then_some(path)
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `Io` if the file can't be read and `ConfigParse` if the YAML is
/// invalid.
pub fn load_config_file(path: &Path) -> Result<SieveConfig> {
    let value = load_config_value(path)?;
    from_value(value, path)
}

/// Parse YAML content into a config.
pub fn parse_config(content: &str, source_path: &Path) -> Result<SieveConfig> {
    serde_yaml::from_str(content).map_err(|e| SieveError::ConfigParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

fn load_config_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Value::Mapping(Default::default()));
    }
    serde_yaml::from_str(&content).map_err(|e| SieveError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn from_value(value: Value, path: &Path) -> Result<SieveConfig> {
    if value.is_null() {
        return Ok(SieveConfig::default());
    }
    serde_yaml::from_value(value).map_err(|e| SieveError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and merge every config file that applies to `project_root`.
///
/// Missing files are skipped; with no files at all the defaults apply.
pub fn load_merged_config(project_root: &Path) -> Result<SieveConfig> {
    load_from_paths(&ConfigPaths::discover(project_root))
}

/// Load and merge the files named by `paths`.
pub fn load_from_paths(paths: &ConfigPaths) -> Result<SieveConfig> {
    let mut merged = Value::Mapping(Default::default());
    let mut last_path = None;

    for path in paths.all_existing() {
        tracing::debug!("Loading config from {}", path.display());
        let value = load_config_value(path)?;
        merged = deep_merge(&merged, &value);
        last_path = Some(path);
    }

    match last_path {
        Some(path) => from_value(merged, path),
        None => Ok(SieveConfig::default()),
    }
}

/// Load config with optional path override.
///
/// If `config_override` is provided, loads only that file without merging.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<SieveConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(project_root),
    }
}

/// Merge `overlay` onto `base`.
///
/// Mappings merge recursively so a project file can add one variable without
/// repeating the user's. Anything else in the overlay replaces the base.
fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Mapping(result)
        }
        (base, Value::Null) => base.clone(),
        (_, overlay) => overlay.clone(),
    }
}
