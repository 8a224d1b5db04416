use super::coingecko::{normalize_detail, normalize_rows, MarketRow};
use super::{get_json, MarketSource, Operation};
use crate::types::Asset;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Local pass-through server in front of CoinGecko. Lists and search
/// results come back as market rows; `/coin/{id}` returns the raw detail
/// payload.
pub struct Proxy {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl Proxy {
    pub fn new(client: reqwest::Client, base_url: String, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl MarketSource for Proxy {
    fn name(&self) -> &str {
        "proxy"
    }

    fn timeout(&self, _op: Operation) -> Duration {
        self.timeout
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Asset>> {
        let rows: Vec<MarketRow> = get_json(
            self.client
                .get(self.url("/coins"))
                .query(&[("page", page), ("per_page", per_page)]),
            "proxy coins",
        )
        .await?;
        Ok(normalize_rows(rows, self.name()))
    }

    async fn search(&self, query: &str) -> Result<Vec<Asset>> {
        let rows: Vec<MarketRow> = get_json(
            self.client
                .get(self.url("/search"))
                .query(&[("query", query)]),
            "proxy search",
        )
        .await?;
        Ok(normalize_rows(rows, self.name()))
    }

    async fn fetch_details(&self, id: &str) -> Result<Asset> {
        let body: Value = get_json(
            self.client.get(self.url(&format!("/coin/{}", id))),
            "proxy coin",
        )
        .await?;
        normalize_detail(&body)
    }
}
