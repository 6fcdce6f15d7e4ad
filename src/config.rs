//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/gradetree/gradetree.toml`
//! 3. Local config: `<dir>/.gradetree.toml` (directory of the gradebook)
//! 4. Environment variables: `GRADETREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::color::{DEFAULT_ANCHORS, DEFAULT_UNGRADED};
use crate::domain::{ColorScale, LetterScale};

/// One color-scale anchor: a whole percentage and an HTML color.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorAnchor {
    pub at: i64,
    pub color: String,
}

/// Letter-grade table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ScaleConfig {
    /// Upper bounds for F through A, e.g. `["60%", "65%", ...]`; None keeps the default table
    pub boundaries: Option<Vec<String>>,
}

/// Display color scale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ColorConfig {
    pub anchors: Vec<ColorAnchor>,
    /// Color of nodes without any grade
    pub ungraded: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            anchors: DEFAULT_ANCHORS
                .iter()
                .map(|&(at, color)| ColorAnchor {
                    at: i64::from(at),
                    color: color.to_string(),
                })
                .collect(),
            ungraded: DEFAULT_UNGRADED.to_string(),
        }
    }
}

/// Raw color config for intermediate parsing (None means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawColorConfig {
    pub anchors: Option<Vec<ColorAnchor>>,
    pub ungraded: Option<String>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub gradebook: Option<PathBuf>,
    pub scale: ScaleConfig,
    pub colors: RawColorConfig,
}

/// Unified configuration for gradetree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    /// Gradebook used when no file is given on the command line
    pub gradebook: Option<PathBuf>,
    pub scale: ScaleConfig,
    pub colors: ColorConfig,
}

/// Get the XDG config directory for gradetree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gradetree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("gradetree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".gradetree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory searched for `.gradetree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths()?;
        Ok(current)
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            gradebook: overlay
                .gradebook
                .clone()
                .or_else(|| self.gradebook.clone()),
            scale: ScaleConfig {
                boundaries: overlay
                    .scale
                    .boundaries
                    .clone()
                    .or_else(|| self.scale.boundaries.clone()),
            },
            colors: ColorConfig {
                anchors: overlay
                    .colors
                    .anchors
                    .clone()
                    .unwrap_or_else(|| self.colors.anchors.clone()),
                ungraded: overlay
                    .colors
                    .ungraded
                    .clone()
                    .unwrap_or_else(|| self.colors.ungraded.clone()),
            },
        }
    }

    /// Apply GRADETREE_* environment variables as explicit overrides.
    ///
    /// `GRADETREE_SCALE__BOUNDARIES` takes a comma-separated list.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("GRADETREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("gradebook") {
            settings.gradebook = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("scale.boundaries") {
            settings.scale.boundaries = Some(val.split(',').map(|s| s.trim().to_string()).collect());
        }
        if let Ok(val) = config.get_string("colors.ungraded") {
            settings.colors.ungraded = val;
        }
        Ok(settings)
    }

    /// Expand `~`, `$VAR` and `${VAR}` in the gradebook path.
    fn expand_paths(&mut self) -> Result<(), ApplicationError> {
        if let Some(path) = &self.gradebook {
            let raw = path.to_string_lossy();
            let expanded = shellexpand::full(&raw).map_err(|e| ApplicationError::Config {
                message: format!("expand {raw}: {e}"),
            })?;
            self.gradebook = Some(PathBuf::from(expanded.into_owned()));
        }
        Ok(())
    }

    pub fn letter_scale(&self) -> Result<LetterScale, ApplicationError> {
        match &self.scale.boundaries {
            None => Ok(LetterScale::default()),
            Some(texts) => LetterScale::from_texts(texts).map_err(|e| ApplicationError::Config {
                message: e.to_string(),
            }),
        }
    }

    pub fn color_scale(&self) -> Result<ColorScale, ApplicationError> {
        let anchors: Vec<(i64, &str)> = self
            .colors
            .anchors
            .iter()
            .map(|a| (a.at, a.color.as_str()))
            .collect();
        ColorScale::new(&anchors, &self.colors.ungraded).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }

    /// Serialize to TOML (for display).
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: e.to_string(),
        })
    }
}
