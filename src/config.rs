use crate::error::{MetaError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Optional config file with defaults that CLI flags override.
///
/// Lives at `~/.config/remeta/config.toml`:
///
/// ```toml
/// [defaults]
/// source_root = "Projects/2019"
/// dest_backend = "box"
///
/// [translation]
/// domain = "new.example"
///
/// [translation.overrides]
/// "shared@old.example" = "team@new.example"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub translation: Translation,
}

#[derive(Debug, Default, Deserialize)]
pub struct Defaults {
    pub source_root: Option<String>,
    pub dest_root: Option<String>,
    /// "drive" or "box".
    pub dest_backend: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Translation {
    pub domain: Option<String>,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl Config {
    /// Load the config file, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| MetaError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| MetaError::Config("could not determine config directory".into()))?;
        Ok(base.join("remeta").join("config.toml"))
    }
}
