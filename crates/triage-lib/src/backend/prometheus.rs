//! Prometheus HTTP API client

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{async_trait, base_url, Alert, MetricsSource, Series};
use crate::error::{Error, Result};

/// Envelope shared by every Prometheus API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<Sample>,
}

#[derive(Debug, Deserialize)]
struct Sample {
    #[serde(default)]
    metric: HashMap<String, String>,
    value: (f64, String),
}

#[derive(Debug, Deserialize)]
struct AlertsData {
    #[serde(default)]
    alerts: Vec<RawAlert>,
}

#[derive(Debug, Deserialize)]
struct RawAlert {
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    annotations: HashMap<String, String>,
    #[serde(default)]
    state: String,
    #[serde(rename = "activeAt", default)]
    active_at: String,
}

impl RawAlert {
    fn into_alert(self) -> Alert {
        let label = |name: &str, default: &str| {
            self.labels
                .get(name)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        Alert {
            name: label("alertname", "unknown"),
            severity: label("severity", "unknown"),
            instance: label("instance", ""),
            summary: self.annotations.get("summary").cloned().unwrap_or_default(),
            active_since: self.active_at.clone(),
        }
    }
}

/// Instant-query client for a Prometheus-compatible API
pub struct PrometheusClient {
    client: Client,
    base_url: Url,
}

impl PrometheusClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url(url)?,
        })
    }

    /// Check the HTTP status and the API envelope, returning the payload
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<Option<T>> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend {
                backend: "prometheus",
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let body: ApiResponse<T> = response.json().await?;
        if body.status != "success" {
            return Err(Error::Backend {
                backend: "prometheus",
                message: body.error.unwrap_or_else(|| format!("status {}", body.status)),
            });
        }
        Ok(body.data)
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    fn endpoint(&self) -> &str {
        self.base_url.as_str()
    }

    async fn vector_query(&self, expr: &str) -> Result<Vec<Series>> {
        let url = self.base_url.join("api/v1/query")?;
        let response = self
            .client
            .get(url)
            .query(&[("query", expr)])
            .send()
            .await?;

        let samples = Self::decode::<QueryData>(response)
            .await?
            .map(|d| d.result)
            .unwrap_or_default();
        let total = samples.len();
        let series: Vec<Series> = samples
            .into_iter()
            .filter_map(|sample| {
                let value = sample.value.1.parse::<f64>().ok()?;
                Some(Series {
                    labels: sample.metric,
                    value,
                })
            })
            .collect();

        debug!(query = %expr, series = total, parsed = series.len(), "Prometheus query finished");
        Ok(series)
    }

    async fn firing_alerts(&self) -> Result<Vec<Alert>> {
        let url = self.base_url.join("api/v1/alerts")?;
        let response = self.client.get(url).send().await?;

        let alerts: Vec<Alert> = Self::decode::<AlertsData>(response)
            .await?
            .map(|d| d.alerts)
            .unwrap_or_default()
            .into_iter()
            .filter(|a| a.state == "firing")
            .map(RawAlert::into_alert)
            .collect();

        debug!(firing = alerts.len(), "Prometheus alerts fetched");
        Ok(alerts)
    }
}
