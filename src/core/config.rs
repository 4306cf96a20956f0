use super::currency::{CurrencyCode, CurrencyPair};
use anyhow::{Context, Result, ensure};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_NBP_BASE_URL: &str = "https://api.nbp.pl";

/// Longest date range the NBP API serves in one series request.
pub const MAX_WINDOW_DAYS: u32 = 93;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NbpProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub nbp: Option<NbpProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            nbp: Some(NbpProviderConfig {
                base_url: DEFAULT_NBP_BASE_URL.to_string(),
            }),
        }
    }
}

/// What a batch refresh does when one pair cannot be refreshed.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failing pair; earlier pairs stay persisted.
    #[default]
    Abort,
    /// Log the failing pair and carry on with the rest.
    Isolate,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SyncConfig {
    pub window_days: u32,
    pub lock_ttl_secs: u64,
    pub anchor_currency: CurrencyCode,
    pub on_failure: FailurePolicy,
    pub pairs: Vec<CurrencyPair>,
    pub retries: usize,
    pub retry_delay_ms: u64,
}

impl SyncConfig {
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_WINDOW_DAYS).contains(&self.window_days),
            "sync.window_days must be between 1 and {MAX_WINDOW_DAYS}, got {}",
            self.window_days
        );
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            window_days: 30,
            lock_ttl_secs: 50,
            anchor_currency: CurrencyCode::default_anchor(),
            on_failure: FailurePolicy::Abort,
            pairs: Vec::new(),
            retries: 3,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "fxsync", "fxsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("in", "fxsync", "fxsync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn nbp_base_url(&self) -> &str {
        self.providers
            .nbp
            .as_ref()
            .map_or(DEFAULT_NBP_BASE_URL, |p| &p.base_url)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .sync
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
