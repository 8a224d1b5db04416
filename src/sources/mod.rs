pub mod coingecko;
pub mod fallback;
pub mod proxy;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::Config;
use crate::types::Asset;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Page,
    Search,
    Details,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Page => "page",
            Self::Search => "search",
            Self::Details => "details",
        })
    }
}

/// A network tier of the gateway.
#[async_trait]
pub trait MarketSource: Send + Sync {
    fn name(&self) -> &str;

    /// How long the gateway waits for `op` before moving to the next tier.
    fn timeout(&self, op: Operation) -> Duration;

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Asset>>;
    async fn search(&self, query: &str) -> Result<Vec<Asset>>;
    async fn fetch_details(&self, id: &str) -> Result<Asset>;
}

/// Tiered access to market data: each network source in order, then the
/// built-in list. Every call runs the cascade from the top; nothing is cached.
pub struct Gateway {
    sources: Vec<Box<dyn MarketSource>>,
    fallback: Vec<Asset>,
    offline: bool,
}

impl Gateway {
    pub fn new(cfg: &Config, client: reqwest::Client, coingecko_api_key: Option<String>) -> Self {
        if cfg.use_backup_data {
            info!("use_backup_data set; network sources disabled");
        }
        if coingecko_api_key.is_none() {
            tracing::debug!("COINGECKO_API_KEY not set; using the keyless CoinGecko tier");
        }
        let sources: Vec<Box<dyn MarketSource>> = vec![
            Box::new(proxy::Proxy::new(
                client.clone(),
                cfg.api_base_url.clone(),
                cfg.proxy_timeout(),
            )),
            Box::new(coingecko::CoinGecko::new(
                client,
                cfg.direct_api_base_url.clone(),
                coingecko_api_key,
                cfg.direct_timeout(),
            )),
        ];
        Self::with_sources(sources, cfg.use_backup_data)
    }

    pub fn with_sources(sources: Vec<Box<dyn MarketSource>>, offline: bool) -> Self {
        Self {
            sources,
            fallback: fallback::static_assets(),
            offline,
        }
    }

    pub fn source_count(&self) -> usize {
        if self.offline {
            0
        } else {
            self.sources.len()
        }
    }

    pub async fn fetch_asset_page(&self, page: u32, per_page: u32) -> Vec<Asset> {
        if !self.offline {
            let fetched =
                first_success(&self.sources, Operation::Page, |s| s.fetch_page(page, per_page))
                    .await;
            if let Some(assets) = fetched {
                return assets;
            }
        }
        info!("serving {} built-in assets for page {}", self.fallback.len(), page);
        self.fallback.clone()
    }

    pub async fn search_assets(&self, query: &str) -> Vec<Asset> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        if !self.offline {
            let found = first_success(&self.sources, Operation::Search, |s| s.search(query)).await;
            if let Some(assets) = found {
                return assets;
            }
        }
        let matches = fallback::filter_assets(&self.fallback, query);
        info!("local search for '{}': {} match(es)", query, matches.len());
        matches
    }

    pub async fn fetch_asset_details(&self, id: &str) -> Option<Asset> {
        if !self.offline {
            let found = first_success(&self.sources, Operation::Details, |s| s.fetch_details(id)).await;
            if found.is_some() {
                return found;
            }
        }
        let asset = fallback::find_asset(&self.fallback, id);
        if asset.is_none() {
            info!("asset '{}' not found in any tier", id);
        }
        asset
    }

    /// First page for startup, raced against `limit`. When the limit wins the
    /// cascade is dropped and the built-in list is used.
    pub async fn load_initial(&self, per_page: u32, limit: Duration) -> Vec<Asset> {
        match tokio::time::timeout(limit, self.fetch_asset_page(1, per_page)).await {
            Ok(assets) => assets,
            Err(_) => {
                warn!("initial load exceeded {:?}; using built-in assets", limit);
                self.fallback.clone()
            }
        }
    }
}

/// Try each source in order, bounded by its own timeout. The first success
/// wins; failures are logged and fall through.
async fn first_success<'s, T, F, Fut>(
    sources: &'s [Box<dyn MarketSource>],
    op: Operation,
    mut call: F,
) -> Option<T>
where
    F: FnMut(&'s dyn MarketSource) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for source in sources {
        let source: &'s dyn MarketSource = source.as_ref();
        let limit = source.timeout(op);
        match tokio::time::timeout(limit, call(source)).await {
            Ok(Ok(value)) => {
                info!("[{}] {} ok", source.name(), op);
                return Some(value);
            }
            Ok(Err(e)) => warn!("[{}] {} failed: {:#}", source.name(), op, e),
            Err(_) => warn!("[{}] {} timed out after {:?}", source.name(), op, limit),
        }
    }
    None
}

/// Send `req`, require a success status and decode the JSON body.
pub(crate) async fn get_json<T: DeserializeOwned>(
    req: reqwest::RequestBuilder,
    source: &str,
) -> Result<T> {
    let resp = req
        .header("Accept", "application/json")
        .send()
        .await
        .with_context(|| format!("{} request failed", source))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("{} HTTP {}: {}", source, status, body);
    }

    resp.json()
        .await
        .with_context(|| format!("{} parse failed", source))
}
