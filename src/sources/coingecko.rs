use super::{get_json, MarketSource, Operation};
use crate::types::Asset;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Ids resolved per search.
const MAX_SEARCH_IDS: usize = 20;
/// Single-character queries match too broadly; resolve fewer ids.
const MAX_SHORT_QUERY_IDS: usize = 5;

/// One row of `/coins/markets`. The proxy returns the same shape.
#[derive(Debug, Deserialize)]
pub(crate) struct MarketRow {
    id: String,
    symbol: String,
    name: String,
    image: Option<String>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    circulating_supply: Option<f64>,
    last_updated: Option<String>,
}

impl MarketRow {
    /// `None` when price, cap or supply is missing or not positive.
    fn into_asset(self) -> Option<Asset> {
        let current_price = positive(self.current_price?)?;
        let market_cap = positive(self.market_cap?)?;
        let circulating_supply = positive(self.circulating_supply?)?;
        Some(Asset {
            last_updated: self.last_updated.as_deref().and_then(parse_timestamp),
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            current_price,
            market_cap,
            circulating_supply,
            image: self.image,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
}

pub(crate) fn normalize_rows(rows: Vec<MarketRow>, source: &str) -> Vec<Asset> {
    let total = rows.len();
    let assets: Vec<Asset> = rows.into_iter().filter_map(MarketRow::into_asset).collect();
    if assets.len() < total {
        debug!(
            "[{}] dropped {} row(s) without usable price/cap/supply",
            source,
            total - assets.len()
        );
    }
    assets
}

/// Flatten a `/coins/{id}` payload (`market_data.current_price.usd`, ...)
/// into an `Asset`.
pub(crate) fn normalize_detail(body: &Value) -> Result<Asset> {
    let id = body
        .get("id")
        .and_then(Value::as_str)
        .context("coin detail: missing id")?;
    let market = body
        .get("market_data")
        .with_context(|| format!("coin detail {}: missing market_data", id))?;

    let current_price = usd(market, "current_price")
        .with_context(|| format!("coin detail {}: missing current_price.usd", id))?;
    let market_cap = usd(market, "market_cap")
        .with_context(|| format!("coin detail {}: missing market_cap.usd", id))?;
    let circulating_supply = market
        .get("circulating_supply")
        .and_then(Value::as_f64)
        .with_context(|| format!("coin detail {}: missing circulating_supply", id))?;

    anyhow::ensure!(
        current_price > 0.0 && market_cap > 0.0 && circulating_supply > 0.0,
        "coin detail {}: price, market cap and supply must be positive",
        id
    );

    Ok(Asset {
        id: id.to_string(),
        symbol: str_field(body, "symbol"),
        name: str_field(body, "name"),
        current_price,
        market_cap,
        circulating_supply,
        image: body
            .get("image")
            .and_then(|i| i.get("large"))
            .and_then(Value::as_str)
            .map(str::to_string),
        last_updated: body
            .get("last_updated")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
    })
}

fn search_ids(hits: SearchResponse, query: &str) -> Vec<String> {
    let cap = if query.chars().count() == 1 {
        MAX_SHORT_QUERY_IDS
    } else {
        MAX_SEARCH_IDS
    };
    hits.coins.into_iter().take(cap).map(|hit| hit.id).collect()
}

fn usd(market: &Value, key: &str) -> Option<f64> {
    market.get(key).and_then(|v| v.get("usd")).and_then(Value::as_f64)
}

fn str_field(obj: &Value, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn positive(v: f64) -> Option<f64> {
    (v.is_finite() && v > 0.0).then_some(v)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

pub struct CoinGecko {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl CoinGecko {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    /// Every CoinGecko request carries its own timeout, so the two search
    /// steps are bounded separately.
    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .timeout(self.timeout);
        match &self.api_key {
            Some(key) => req.header("x-cg-demo-api-key", key),
            None => req,
        }
    }
}

#[async_trait]
impl MarketSource for CoinGecko {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn timeout(&self, op: Operation) -> Duration {
        match op {
            Operation::Search => self.timeout * 2,
            Operation::Page | Operation::Details => self.timeout,
        }
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Asset>> {
        let page = page.to_string();
        let per_page = per_page.to_string();
        let rows: Vec<MarketRow> = get_json(
            self.get("/coins/markets").query(&[
                ("vs_currency", "usd"),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
                ("sparkline", "false"),
            ]),
            "CoinGecko markets",
        )
        .await?;
        Ok(normalize_rows(rows, self.name()))
    }

    async fn search(&self, query: &str) -> Result<Vec<Asset>> {
        let hits: SearchResponse = get_json(
            self.get("/search").query(&[("query", query)]),
            "CoinGecko search",
        )
        .await?;

        let ids = search_ids(hits, query);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        debug!("CoinGecko search '{}' resolved {} id(s)", query, ids.len());

        let ids = ids.join(",");
        let rows: Vec<MarketRow> = get_json(
            self.get("/coins/markets").query(&[
                ("vs_currency", "usd"),
                ("ids", ids.as_str()),
                ("order", "market_cap_desc"),
                ("sparkline", "false"),
            ]),
            "CoinGecko markets",
        )
        .await?;
        Ok(normalize_rows(rows, self.name()))
    }

    async fn fetch_details(&self, id: &str) -> Result<Asset> {
        let body: Value = get_json(
            self.get(&format!("/coins/{}", id)).query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("market_data", "true"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ]),
            "CoinGecko coin",
        )
        .await?;
        normalize_detail(&body)
    }
}
