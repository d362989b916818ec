//! Dashboard configuration.
//!
//! Read from a JSON file with every field optional, then overridden by the
//! environment:
//! - `RETAIL_LENS_CONFIG`  path of the JSON file (default: `retail-lens.json`, if present)
//! - `RETAIL_LENS_DATASET` dataset path (default: `Data_Set.csv`)

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::data::filter::TopN;

pub const CONFIG_ENV: &str = "RETAIL_LENS_CONFIG";
pub const DATASET_ENV: &str = "RETAIL_LENS_DATASET";
pub const DEFAULT_CONFIG_FILE: &str = "retail-lens.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub dataset_path: PathBuf,
    pub default_top_n: i64,
    pub show_chart: bool,
    pub show_table: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("Data_Set.csv"),
            default_top_n: TopN::default().get() as i64,
            show_chart: true,
            show_table: true,
        }
    }
}

impl DashboardConfig {
    /// Resolve the configuration from file and environment.
    pub fn load() -> Result<Self> {
        let explicit = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match &explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Some(path) = env::var_os(DATASET_ENV) {
            config.dataset_path = PathBuf::from(path);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The configured default, pulled into the allowed range.
    pub fn top_n(&self) -> TopN {
        TopN::clamped(self.default_top_n)
    }
}
