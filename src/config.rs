use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::grouping::{DEFAULT_OUTPUT_FOLDER, DEFAULT_SIMILARITY_THRESHOLD};
use crate::progress::ProgressMode;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GroupingConfig {
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// File-name globs left out of the listing entirely.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            similarity_threshold: default_similarity_threshold(),
            exclude_globs: Vec::new(),
        }
    }
}

fn default_output_folder() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_FOLDER)
}
fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProgressConfig {
    #[serde(default = "default_progress_mode")]
    pub mode: String,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            mode: default_progress_mode(),
        }
    }
}

fn default_progress_mode() -> String {
    "auto".to_string()
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    pub fn progress_mode(&self) -> Result<ProgressMode> {
        ProgressMode::parse(&self.progress.mode).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown progress mode: '{}'. Must be auto, off, human, or json.",
                self.progress.mode
            )
        })
    }
}

impl GroupingConfig {
    pub fn exclude_set(&self) -> Result<GlobSet> {
        build_globset(&self.exclude_globs)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Out-of-range thresholds are allowed; NaN would make every comparison false.
    if !config.grouping.similarity_threshold.is_finite() {
        anyhow::bail!("grouping.similarity_threshold must be a finite number");
    }

    config
        .grouping
        .exclude_set()
        .with_context(|| "Invalid grouping.exclude_globs")?;

    config.progress_mode()?;

    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
