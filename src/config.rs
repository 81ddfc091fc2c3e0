use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::risk::{TierBand, TierTable};

pub const CONFIG_FILE: &str = "mindscan.toml";
pub const MODEL_ENV: &str = "MINDSCAN_MODEL";

/// Settings read from `mindscan.toml`.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Classifier artifact, loaded once at startup.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default)]
    pub tiers: TierConfig,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            model_path: default_model_path(),
            tiers: TierConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TierPreset {
    #[default]
    Standard,
    Coarse,
}

/// Either a named preset or explicit bands; explicit bands win.
#[derive(Debug, Deserialize, Default)]
pub struct TierConfig {
    #[serde(default)]
    pub preset: TierPreset,
    pub bands: Option<Vec<TierBand>>,
}

impl TierConfig {
    pub fn table(&self) -> Result<TierTable> {
        if let Some(bands) = &self.bands {
            return TierTable::new(bands.clone()).context("invalid [tiers] bands");
        }

        Ok(match self.preset {
            TierPreset::Standard => TierTable::default(),
            TierPreset::Coarse => TierTable::coarse(),
        })
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Load configuration, searching in order:
///
/// 1. `config_override`, the path passed via `--config`
/// 2. `<base_dir>/mindscan.toml`
/// 3. Built-in [`Config::default`]
pub fn load_config(base_dir: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let local = base_dir.join(CONFIG_FILE);
    if local.exists() {
        return read_config(&local);
    }

    Ok(Config::default())
}
