//! Harvester configuration.
//!
//! Loaded from a TOML file (explicit path, or `photoharvest.toml` in the
//! working directory) with environment overrides for the browser section.
//! Missing sections and fields fall back to their defaults.

pub mod browser;
pub mod selectors;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub use browser::BrowserEngineConfig;
pub use selectors::{
    ConsentConfig, LayoutSelectors, LoginSelectors, SelectorConfig, SiteConfig, VariantSelectors,
};

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "photoharvest.toml";

/// Bounds applied to probing, revealing and expanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Seconds each layout marker probe waits.
    pub probe_timeout: u64,
    /// Seconds to wait for the review panel after opening it.
    pub panel_timeout: u64,
    /// Maximum reveal steps for one region.
    pub max_steps: usize,
    /// Maximum seconds one reveal may take.
    pub max_elapsed: u64,
    /// Maximum "view more" activations in one expansion loop.
    pub max_expansion_rounds: usize,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            probe_timeout: 30,
            panel_timeout: 30,
            max_steps: 200,
            max_elapsed: 900,
            max_expansion_rounds: 50,
        }
    }
}

impl RevealConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn panel_timeout(&self) -> Duration {
        Duration::from_secs(self.panel_timeout)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_secs(self.max_elapsed)
    }
}

/// Where downloaded photos and sessions are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub photos_dir: PathBuf,
    pub sessions_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            photos_dir: PathBuf::from("photos"),
            sessions_dir: PathBuf::from(".photoharvest/sessions"),
        }
    }
}

/// Complete harvester configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub browser: BrowserEngineConfig,
    pub site: SiteConfig,
    pub selectors: SelectorConfig,
    pub reveal: RevealConfig,
    pub output: OutputConfig,
}

impl HarvestConfig {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).context("Failed to parse harvester config")
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `photoharvest.toml` in the
    /// working directory is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => {
                let candidate = PathBuf::from(CONFIG_FILE_NAME);
                candidate.exists().then_some(candidate)
            }
        };

        let config = match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_toml(&content)?
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        Ok(config.with_env_overrides())
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.browser = self.browser.with_env_overrides();
        self
    }
}
