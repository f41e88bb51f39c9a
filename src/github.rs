//! Low-level client for the hosting API.
//!
//! All calls go through [`GitHubClient::get_json`], which applies the bounded
//! throttle-retry policy: the hosting API signals rate limiting by replacing
//! the expected payload with an object carrying a `message` field, and such
//! responses are retried after a fixed backoff until the attempt ceiling is
//! reached.

use crate::config::{AppConfig, RetryPolicy};
use crate::error::ApiError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;

/// Repository summary fields used by the star/fork variants and the final
/// payload. Schema owned by the hosting API.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoSummary {
    pub stargazers_count: u64,
    pub forks_count: u64,
}

#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        if let Some(token) = &config.github_token {
            let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.github_api_url.trim_end_matches('/').to_string(),
            retry: config.retry_policy(),
        })
    }

    /// Fetches star and fork counts for an `"owner/name"` repository.
    pub async fn repo_summary(&self, full_name: &str) -> Result<RepoSummary, ApiError> {
        let url = format!("{}/repos/{}", self.base_url, full_name);
        let (body, _) = self.get_json(&url, &[]).await?;
        serde_json::from_value(body).map_err(|_| ApiError::DataUnavailable)
    }

    /// One page of the issue search endpoint. `page` is omitted for page 1.
    pub async fn search_issues(
        &self,
        query: &str,
        page: Option<u32>,
    ) -> Result<(Value, HeaderMap), ApiError> {
        let url = format!("{}/search/issues", self.base_url);
        let mut params = vec![
            ("q", query.to_string()),
            ("per_page", "100".to_string()),
            ("state", "open".to_string()),
        ];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        self.get_json(&url, &params).await
    }

    /// One page of a bare-list repository endpoint (`commits`, `releases`).
    pub async fn list(
        &self,
        path: &str,
        page: Option<u32>,
    ) -> Result<(Value, HeaderMap), ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut params = vec![("per_page", "100".to_string())];
        if let Some(page) = page {
            params.push(("page", page.to_string()));
        }
        self.get_json(&url, &params).await
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<(Value, HeaderMap), ApiError> {
        let mut attempts = 0;
        loop {
            let response = self.client.get(url).query(params).send().await?;
            let headers = response.headers().clone();
            let body: Value = response.json().await?;

            if !throttle_notice(&body) {
                return Ok((body, headers));
            }

            attempts += 1;
            if attempts >= self.retry.max_attempts {
                return Err(ApiError::RateLimitExceeded { attempts });
            }
            tracing::warn!(
                url,
                attempts,
                backoff_secs = self.retry.backoff.as_secs(),
                "hosting API throttled, backing off"
            );
            tokio::time::sleep(self.retry.backoff).await;
        }
    }
}

/// A throttled (or otherwise refused) response replaces the expected payload
/// with an object carrying a `message` field. List bodies are arrays, so the
/// check is body-level only.
pub fn throttle_notice(body: &Value) -> bool {
    body.as_object().is_some_and(|o| o.contains_key("message"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn throttle_notice_detects_message_objects() {
        assert!(throttle_notice(
            &json!({"message": "API rate limit exceeded"})
        ));
        assert!(!throttle_notice(&json!({"total_count": 0, "items": []})));
        // Bare list pages are never notices, even when items nest a
        // "message" field (commit objects do).
        assert!(!throttle_notice(
            &json!([{"commit": {"message": "fix build"}}])
        ));
    }

    #[test]
    fn repo_summary_deserializes() {
        let summary: RepoSummary = serde_json::from_value(json!({
            "stargazers_count": 1420,
            "forks_count": 37,
            "open_issues_count": 5
        }))
        .unwrap();
        assert_eq!(summary.stargazers_count, 1420);
        assert_eq!(summary.forks_count, 37);
    }
}
