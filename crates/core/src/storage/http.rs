use crate::config::Settings;
use crate::domain::BrokerRecord;
use crate::storage::source::BrokerSource;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Reads raw rows from an upstream `/api/brokers` endpoint.
///
/// The base URL is fixed at construction; nothing is resolved per call.
#[derive(Debug, Clone)]
pub struct HttpBrokerSource {
    http: reqwest::Client,
    base_url: reqwest::Url,
    retries: u32,
}

impl HttpBrokerSource {
    pub fn new(base_url: &str, timeout: Duration, retries: u32) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("invalid broker api base url: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "broker api base url cannot be a base: {base_url}"
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build broker api http client")?;

        Ok(Self {
            http,
            base_url,
            retries: retries.max(1),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_broker_api_base_url()?;

        let timeout_secs = std::env::var("BROKER_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("BROKER_API_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        Self::new(base_url, Duration::from_secs(timeout_secs), retries)
    }

    fn url(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_once(&self, url: reqwest::Url) -> Result<Option<String>> {
        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("broker api request failed: {url}"))?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = res
            .text()
            .await
            .context("failed to read broker api response")?;
        if !status.is_success() {
            anyhow::bail!("broker api HTTP {status}: {text}");
        }
        Ok(Some(text))
    }

    async fn get(&self, url: reqwest::Url) -> Result<Option<String>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_once(url.clone()).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_for(attempt);
                    tracing::warn!(attempt, ?backoff, error = %err, "broker api fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl BrokerSource for HttpBrokerSource {
    fn source_name(&self) -> &'static str {
        "http"
    }

    async fn fetch_all(&self) -> Result<Vec<BrokerRecord>> {
        let Some(text) = self.get(self.url(&["api", "brokers"])).await? else {
            anyhow::bail!("broker api returned 404 for the broker list");
        };
        parse_list(&text)
    }

    async fn fetch_by_code(&self, code: &str) -> Result<Option<BrokerRecord>> {
        let Some(text) = self.get(self.url(&["api", "brokers", code])).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str::<BrokerRecord>(&text)
            .with_context(|| format!("broker api returned an invalid broker: {text}"))?;
        Ok(Some(record))
    }
}

// Doubles per attempt, capped at 16s.
fn backoff_for(attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_millis(BASE_BACKOFF_MS << shift)
}

fn parse_list(text: &str) -> Result<Vec<BrokerRecord>> {
    let value = serde_json::from_str::<serde_json::Value>(text)
        .with_context(|| format!("broker api response is not valid JSON: {text}"))?;

    // Upstream answers a non-array body when it has no data.
    let serde_json::Value::Array(rows) = value else {
        tracing::warn!("broker api returned a non-array body; treating as empty");
        return Ok(Vec::new());
    };

    // A row that does not fit is dropped on its own; the rest still load.
    let mut out = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<BrokerRecord>(row) {
            Ok(record) => out.push(record),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping unreadable broker row");
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_urls_under_base_path() {
        let source =
            HttpBrokerSource::new("https://example.com/", Duration::from_secs(1), 1).unwrap();
        assert_eq!(
            source.url(&["api", "brokers"]).as_str(),
            "https://example.com/api/brokers"
        );

        let nested =
            HttpBrokerSource::new("https://example.com/site", Duration::from_secs(1), 1).unwrap();
        assert_eq!(
            nested.url(&["api", "brokers", "fx pro"]).as_str(),
            "https://example.com/site/api/brokers/fx%20pro"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpBrokerSource::new("not a url", Duration::from_secs(1), 1).is_err());
        assert!(HttpBrokerSource::new("mailto:a@b.c", Duration::from_secs(1), 1).is_err());
    }

    #[test]
    fn parses_list_and_tolerates_non_array() {
        let rows = parse_list(
            r#"[{"code":"a","broker":"Alpha","total_score":"9.2","license_info":"[]"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_score, Some(9.2));

        assert!(parse_list(r#"{"error":"db down"}"#).unwrap().is_empty());
        assert!(parse_list("<html>").is_err());
    }

    #[test]
    fn one_bad_row_does_not_drop_the_list() {
        let rows = parse_list(
            r#"[
                {"code":"a","broker":"Alpha","total_score":9.2},
                {"code":"b","broker":["not","a","name"]},
                {"code":"c","broker":"Gamma","total_score":6.0}
            ]"#,
        )
        .unwrap();
        let names: Vec<_> = rows.iter().map(|r| r.broker.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
    }

    #[test]
    fn numeric_codes_and_json_blob_columns_are_accepted() {
        let rows = parse_list(
            r#"[
                {"code":"a","broker":"Alpha","total_score":9.2},
                {"code":42,"broker":"Answer","total_score":7.0,
                 "pros":{"pros":["x"]},
                 "license_info":[{"监管状态":"Active","牌照信息":"FCA 1"}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].code.as_deref(), Some("42"));

        let parsed = crate::normalize::normalize(rows[1].clone());
        assert_eq!(
            parsed.pros.as_option().map(|p| p.pros.clone()),
            Some(vec!["x".to_string()])
        );
        assert_eq!(parsed.license_entries().len(), 1);
        assert_eq!(parsed.license_entries()[0].license_detail, "FCA 1");
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_for(1), Duration::from_millis(250));
        assert_eq!(backoff_for(2), Duration::from_millis(500));
        assert_eq!(backoff_for(7), Duration::from_millis(16_000));
        assert_eq!(backoff_for(100), Duration::from_millis(16_000));
    }
}
