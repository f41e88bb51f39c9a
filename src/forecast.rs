//! Relay of normalized record sets to the external forecasting service.
//!
//! Each record set is posted to three model endpoints (neural, statistical,
//! decomposition). The calls fan out concurrently and each produces a tagged
//! result; responses are merged deterministically by label, and any failed
//! call fails the whole request with a `ForecastUnavailable` condition naming
//! the label that broke.

use crate::config::AppConfig;
use crate::error::ApiError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Model endpoints and the label suffix their responses merge under. The
/// neural forecaster keeps the bare series label.
const MODEL_ROUTES: &[(&str, &str)] = &[
    ("", "api/forecast"),
    ("Statm", "api/statm"),
    ("Prophet", "api/prophet"),
];

/// One record set to relay, tagged with the label its responses merge under.
pub struct SeriesSet {
    /// Base payload key, e.g. `createdAtImageUrls`.
    pub key: &'static str,
    /// Series-type tag understood by the forecaster (`created_at`/`closed_at`).
    pub series_type: &'static str,
    /// Optional record-kind tag (`pull`, `commit`, `release`).
    pub record_kind: Option<&'static str>,
    pub records: Vec<Value>,
}

/// Request contract of the forecasting service. Response bodies are opaque
/// JSON merged verbatim into the payload, never inspected field by field.
#[derive(Serialize)]
struct ForecastRequest<'a> {
    issues: &'a [Value],
    #[serde(rename = "type")]
    series_type: &'a str,
    repo: &'a str,
    #[serde(rename = "issue_type", skip_serializing_if = "Option::is_none")]
    record_kind: Option<&'a str>,
}

#[derive(Clone)]
pub struct ForecastClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: config.forecast_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Posts every set to every model endpoint and merges the responses,
    /// keyed by series label plus model suffix.
    pub async fn relay_all(
        &self,
        repo_full_name: &str,
        sets: &[SeriesSet],
    ) -> Result<BTreeMap<String, Value>, ApiError> {
        // The forecaster is addressed with the bare repository name.
        let repo = repo_full_name
            .rsplit('/')
            .next()
            .unwrap_or(repo_full_name);

        let calls = sets.iter().flat_map(|set| {
            MODEL_ROUTES.iter().map(move |(suffix, route)| {
                self.relay_one(format!("{}{}", set.key, suffix), route, set, repo)
            })
        });
        let results = futures::future::join_all(calls).await;

        let mut merged = BTreeMap::new();
        for (label, result) in results {
            match result {
                Ok(body) => {
                    merged.insert(label, body);
                }
                Err(reason) => {
                    return Err(ApiError::ForecastUnavailable { label, reason });
                }
            }
        }
        Ok(merged)
    }

    async fn relay_one(
        &self,
        label: String,
        route: &str,
        set: &SeriesSet,
        repo: &str,
    ) -> (String, Result<Value, String>) {
        let url = format!("{}/{}", self.base_url, route);
        let body = ForecastRequest {
            issues: &set.records,
            series_type: set.series_type,
            repo,
            record_kind: set.record_kind,
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(e) => return (label, Err(e.to_string())),
        };
        if !response.status().is_success() {
            return (label, Err(format!("status {}", response.status())));
        }
        match response.json::<Value>().await {
            Ok(body) => (label, Ok(body)),
            Err(e) => (label, Err(format!("malformed body: {e}"))),
        }
    }
}

/// Serializes a record slice into the opaque JSON array the forecaster takes.
pub fn to_records<T: Serialize>(records: &[T]) -> Vec<Value> {
    records
        .iter()
        .filter_map(|r| serde_json::to_value(r).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_matches_forecaster_contract() {
        let records = vec![json!({"issue_number": 1, "created_at": "2024-01-05"})];
        let body = ForecastRequest {
            issues: &records,
            series_type: "created_at",
            repo: "Hello-World",
            record_kind: Some("pull"),
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["type"], "created_at");
        assert_eq!(value["repo"], "Hello-World");
        assert_eq!(value["issue_type"], "pull");
        assert_eq!(value["issues"][0]["issue_number"], 1);
    }

    #[test]
    fn record_kind_is_omitted_when_absent() {
        let body = ForecastRequest {
            issues: &[],
            series_type: "closed_at",
            repo: "Hello-World",
            record_kind: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("issue_type").is_none());
    }

    #[test]
    fn labels_combine_series_key_and_model_suffix() {
        let labels: Vec<String> = MODEL_ROUTES
            .iter()
            .map(|(suffix, _)| format!("createdAtImageUrls{suffix}"))
            .collect();
        assert_eq!(
            labels,
            [
                "createdAtImageUrls",
                "createdAtImageUrlsStatm",
                "createdAtImageUrlsProphet"
            ]
        );
    }
}
