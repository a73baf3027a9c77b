use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{WorkshopError, WorkshopResult};
use crate::performance::{AdvisorThresholds, MemoryLimit, ScenarioConfig};

const APP_DIR: &str = "workshop-perf";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    pub thresholds: AdvisorThresholds,
    pub output: OutputSettings,
    pub live: LiveSettings,
    pub demo: ScenarioConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub interval_secs: u64,
    pub samples: u32,
    /// Host shorthand; total system memory when absent
    pub memory_limit: Option<String>,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1,
            samples: 3,
            memory_limit: None,
        }
    }
}

impl LiveSettings {
    pub fn memory_limit(&self) -> Option<MemoryLimit> {
        self.memory_limit.as_deref().map(MemoryLimit::parse)
    }
}

impl WorkshopConfig {
    /// `<dir>/config.toml` when a directory is given, otherwise
    /// `<user config dir>/workshop-perf/config.toml`
    pub fn default_path(config_dir: Option<&Path>) -> WorkshopResult<PathBuf> {
        let base = match config_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::config_dir()
                .ok_or_else(|| WorkshopError::invalid_config("Cannot find config directory"))?
                .join(APP_DIR),
        };
        Ok(base.join(CONFIG_FILE))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> WorkshopResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> WorkshopResult<()> {
        self.validate()?;

        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        info!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Load from the config directory, falling back to defaults when no file exists
    pub fn load_or_default(config_dir: Option<&Path>) -> WorkshopResult<Self> {
        let path = Self::default_path(config_dir)?;
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            Self::load_from_file(&path)
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> WorkshopResult<()> {
        self.thresholds.validate()?;
        self.demo.validate()?;

        if self.live.interval_secs == 0 {
            return Err(WorkshopError::invalid_config("Live sampling interval cannot be zero"));
        }
        if self.live.samples == 0 {
            return Err(WorkshopError::invalid_config("Live sample count cannot be zero"));
        }

        Ok(())
    }
}
