use super::{MarketSource, Operation};
use crate::types::Asset;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn asset(id: &str, price: f64) -> Asset {
    Asset {
        id: id.to_string(),
        symbol: id.chars().take(3).collect(),
        name: id.to_string(),
        current_price: price,
        market_cap: price * 1_000_000.0,
        circulating_supply: 1_000_000.0,
        image: None,
        last_updated: None,
    }
}

#[derive(Clone)]
pub(crate) enum Behavior {
    Succeed(Vec<Asset>),
    Fail,
    /// Never answers within any tier timeout.
    Hang,
}

/// In-memory source recording every call as `op:args`.
pub(crate) struct FakeSource {
    name: &'static str,
    behavior: Behavior,
    latency: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeSource {
    pub(crate) fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            behavior,
            latency: Duration::ZERO,
            calls: Arc::default(),
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    async fn respond(&self, call: String) -> Result<Vec<Asset>> {
        self.calls.lock().unwrap().push(call);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.behavior {
            Behavior::Succeed(assets) => Ok(assets.clone()),
            Behavior::Fail => anyhow::bail!("{} unavailable", self.name),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                anyhow::bail!("{} hung", self.name)
            }
        }
    }
}

#[async_trait]
impl MarketSource for FakeSource {
    fn name(&self) -> &str {
        self.name
    }

    fn timeout(&self, _op: Operation) -> Duration {
        Duration::from_secs(2)
    }

    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Asset>> {
        self.respond(format!("page:{}:{}", page, per_page)).await
    }

    async fn search(&self, query: &str) -> Result<Vec<Asset>> {
        let assets = self.respond(format!("search:{}", query)).await?;
        Ok(assets
            .into_iter()
            .filter(|a| a.id.contains(&query.to_lowercase()))
            .collect())
    }

    async fn fetch_details(&self, id: &str) -> Result<Asset> {
        let assets = self.respond(format!("details:{}", id)).await?;
        assets
            .into_iter()
            .find(|a| a.id == id)
            .ok_or_else(|| anyhow::anyhow!("{} has no asset '{}'", self.name, id))
    }
}
