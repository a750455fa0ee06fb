use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read build config")]
    Io(#[from] std::io::Error),
    #[error("malformed build config")]
    Json(#[from] serde_json::Error),
}

/// Everything a batch build reads. Shared by all outfit builds and never
/// changed while one runs.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BuildConfig {
    pub project_path: PathBuf,
    pub output_data_path: PathBuf,
    #[serde(default)]
    pub outfit_sources: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub preset: BTreeMap<String, PresetValue>,
    #[serde(default)]
    pub zap_choices: BTreeMap<String, BTreeMap<String, bool>>,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

/// Preset slider values in percent, as stored in preset files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PresetValue {
    #[serde(default)]
    pub small: f32,
    #[serde(default)]
    pub big: f32,
}

fn default_weight() -> f32 {
    100.0
}

impl BuildConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Root all slider-set data folders are relative to.
    pub fn base_data_path(&self) -> PathBuf {
        self.project_path.join("ShapeData")
    }

    pub fn big_value(&self, slider: &str, default: f32) -> f32 {
        self.preset
            .get(slider)
            .map(|p| p.big / 100.0)
            .unwrap_or(default)
    }

    pub fn small_value(&self, slider: &str, default: f32) -> f32 {
        self.preset
            .get(slider)
            .map(|p| p.small / 100.0)
            .unwrap_or(default)
    }

    pub fn zap_choice(&self, outfit: &str, zap: &str) -> Option<bool> {
        self.zap_choices.get(outfit)?.get(zap).copied()
    }
}
