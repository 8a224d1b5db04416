use crate::format::Locale;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Skip the network and serve the built-in asset list.
    pub use_backup_data: bool,
    /// Base URL of the local proxy (tier 1).
    pub api_base_url: String,
    /// Base URL of the CoinGecko API (tier 2).
    pub direct_api_base_url: String,
    /// Budget for the initial list load, raced against the whole cascade.
    pub api_timeout_ms: u64,
    pub proxy_timeout_ms: u64,
    /// Per-request timeout for CoinGecko; two-step search gets it per step.
    pub direct_timeout_ms: u64,
    pub search_debounce_ms: u64,
    pub items_per_page: u32,
    pub default_decimals: usize,
    pub small_number_threshold: f64,
    pub scientific_notation_threshold: f64,
    pub locale: Locale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_backup_data: false,
            api_base_url: "http://localhost:3000/api".to_string(),
            direct_api_base_url: "https://api.coingecko.com/api/v3".to_string(),
            api_timeout_ms: 3000,
            proxy_timeout_ms: 2000,
            direct_timeout_ms: 3000,
            search_debounce_ms: 300,
            items_per_page: 20,
            default_decimals: 2,
            small_number_threshold: 0.01,
            scientific_notation_threshold: 0.000_000_1,
            locale: Locale::EsEs,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config = Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("{} not found; using default configuration", path.display());
            Ok(Self::default())
        }
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            anyhow::bail!("api_base_url must not be empty");
        }
        if self.direct_api_base_url.trim().is_empty() {
            anyhow::bail!("direct_api_base_url must not be empty");
        }
        for (key, value) in [
            ("api_timeout_ms", self.api_timeout_ms),
            ("proxy_timeout_ms", self.proxy_timeout_ms),
            ("direct_timeout_ms", self.direct_timeout_ms),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", key);
            }
        }
        if self.items_per_page == 0 {
            anyhow::bail!("items_per_page must be greater than zero");
        }
        if self.default_decimals > 8 {
            anyhow::bail!(
                "default_decimals must be at most 8 (got {})",
                self.default_decimals
            );
        }
        for (key, value) in [
            ("small_number_threshold", self.small_number_threshold),
            ("scientific_notation_threshold", self.scientific_notation_threshold),
        ] {
            if !value.is_finite() || value <= 0.0 {
                anyhow::bail!("{} must be a positive number (got {})", key, value);
            }
        }
        if self.scientific_notation_threshold >= self.small_number_threshold {
            anyhow::bail!(
                "scientific_notation_threshold ({}) must be below small_number_threshold ({})",
                self.scientific_notation_threshold,
                self.small_number_threshold
            );
        }
        Ok(())
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_millis(self.proxy_timeout_ms)
    }

    pub fn direct_timeout(&self) -> Duration {
        Duration::from_millis(self.direct_timeout_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}
