use crate::config::Settings;
use crate::domain::{BrokerParsed, BrokerRecord};
use crate::normalize::{normalize, normalize_all};
use crate::storage::{HttpBrokerSource, PgBrokerSource};
use anyhow::Result;
use std::sync::Arc;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Where raw broker rows come from. Implementations own transport, retries
/// and timeouts; callers only see rows or an error.
#[async_trait::async_trait]
pub trait BrokerSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn fetch_all(&self) -> Result<Vec<BrokerRecord>>;

    async fn fetch_by_code(&self, code: &str) -> Result<Option<BrokerRecord>>;
}

/// Fixed rows held in memory. Used for degraded mode and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBrokerSource {
    records: Vec<BrokerRecord>,
}

impl StaticBrokerSource {
    pub fn new(records: Vec<BrokerRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl BrokerSource for StaticBrokerSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn fetch_all(&self) -> Result<Vec<BrokerRecord>> {
        Ok(self.records.clone())
    }

    async fn fetch_by_code(&self, code: &str) -> Result<Option<BrokerRecord>> {
        let lowered = code.to_lowercase();
        let found = self
            .records
            .iter()
            .find(|r| r.code.as_deref() == Some(code))
            .or_else(|| {
                self.records
                    .iter()
                    .find(|r| r.broker.replace(' ', "-").to_lowercase() == lowered)
            });
        Ok(found.cloned())
    }
}

/// Picks the configured source: Postgres when `DATABASE_URL` is set,
/// otherwise the upstream HTTP API.
pub async fn open_source(settings: &Settings) -> Result<Arc<dyn BrokerSource>> {
    if let Some(db_url) = settings.database_url.as_deref() {
        let source = PgBrokerSource::connect(db_url, DEFAULT_MAX_CONNECTIONS).await?;
        return Ok(Arc::new(source));
    }

    if settings.broker_api_base_url.is_some() {
        return Ok(Arc::new(HttpBrokerSource::from_settings(settings)?));
    }

    anyhow::bail!("no broker source configured (set DATABASE_URL or BROKER_API_BASE_URL)")
}

/// Fetches and normalizes every broker. A fetch failure is logged and yields
/// an empty list so views render empty instead of failing.
pub async fn load_brokers(source: &dyn BrokerSource) -> Vec<BrokerParsed> {
    match source.fetch_all().await {
        Ok(records) => {
            tracing::debug!(source = source.source_name(), rows = records.len(), "fetched brokers");
            normalize_all(records)
        }
        Err(err) => {
            tracing::error!(source = source.source_name(), error = %err, "broker fetch failed; serving empty list");
            Vec::new()
        }
    }
}

/// Fetches one broker. `None` covers both a miss and a failed fetch.
pub async fn load_broker(source: &dyn BrokerSource, code: &str) -> Option<BrokerParsed> {
    match source.fetch_by_code(code).await {
        Ok(found) => found.map(normalize),
        Err(err) => {
            tracing::error!(source = source.source_name(), %code, error = %err, "broker lookup failed");
            None
        }
    }
}
