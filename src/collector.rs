//! Service layer driving the windowed collection of repository metadata.
//!
//! One collector call fans a repository identifier out into the sequential
//! chain of hosting-API requests: one issue search per time window (each with
//! its own pagination), then the commit and release listings.

use crate::error::ApiError;
use crate::github::GitHubClient;
use crate::paginate::{self, ItemKind};
use crate::windows::{oldest_boundary, TimeWindow};
use chrono::NaiveDate;
use serde_json::Value;

/// Raw issue items collected over every window, plus the oldest window
/// boundary reached (lower bound for downstream zero-filling).
pub struct IssueHarvest {
    pub items: Vec<Value>,
    pub oldest: NaiveDate,
}

#[derive(Clone)]
pub struct MetadataCollector {
    github: GitHubClient,
}

impl MetadataCollector {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    /// Collects every issue and pull-request item created inside the given
    /// windows. Items are appended in window order, page order within a
    /// window; no dedup key is applied (windows do not overlap).
    pub async fn collect_issues(
        &self,
        repo: &str,
        windows: &[TimeWindow],
        today: NaiveDate,
    ) -> Result<IssueHarvest, ApiError> {
        let mut items = Vec::new();

        for window in windows {
            let query = format!(
                "repo:{} created:{}..{}",
                repo,
                window.start,
                window.last_day()
            );
            let (mut body, headers) = self.github.search_issues(&query, None).await?;

            // Known upstream inconsistency: a non-zero total_count paired
            // with an empty item page. One blind re-issue, then accept
            // whatever comes back.
            if count_mismatch(&body) {
                tracing::warn!(query, "total_count/items mismatch, re-issuing search once");
                (body, _) = self.github.search_issues(&query, None).await?;
            }

            let first_page = ItemKind::Issue
                .items(&body)
                .ok_or(ApiError::DataUnavailable)?;
            items.extend(first_page.iter().cloned());

            let rest = paginate::remaining_items(&headers, ItemKind::Issue, |page| {
                self.github.search_issues(&query, Some(page))
            })
            .await?;
            items.extend(rest);

            tracing::debug!(query, total = items.len(), "window collected");
        }

        Ok(IssueHarvest {
            items,
            oldest: oldest_boundary(windows, today),
        })
    }

    /// Full commit listing for a repository, across all pages.
    pub async fn collect_commits(&self, repo: &str) -> Result<Vec<Value>, ApiError> {
        self.collect_listing(repo, "commits", ItemKind::Commit).await
    }

    /// Full release listing for a repository, across all pages.
    pub async fn collect_releases(&self, repo: &str) -> Result<Vec<Value>, ApiError> {
        self.collect_listing(repo, "releases", ItemKind::Release).await
    }

    async fn collect_listing(
        &self,
        repo: &str,
        endpoint: &str,
        kind: ItemKind,
    ) -> Result<Vec<Value>, ApiError> {
        let path = format!("repos/{repo}/{endpoint}");
        let (body, headers) = self.github.list(&path, None).await?;

        let mut items: Vec<Value> = kind
            .items(&body)
            .ok_or(ApiError::DataUnavailable)?
            .clone();

        let rest = paginate::remaining_items(&headers, kind, |page| {
            self.github.list(&path, Some(page))
        })
        .await?;
        items.extend(rest);

        Ok(items)
    }

    /// Search total_count for an arbitrary issue query; used by the
    /// line-chart and stacked-count request variants.
    pub async fn issue_count(&self, query: &str) -> Result<u64, ApiError> {
        let (body, _) = self.github.search_issues(query, None).await?;
        body.get("total_count")
            .and_then(Value::as_u64)
            .ok_or(ApiError::DataUnavailable)
    }
}

fn count_mismatch(body: &Value) -> bool {
    let total = body.get("total_count").and_then(Value::as_u64).unwrap_or(0);
    let empty = body
        .get("items")
        .and_then(Value::as_array)
        .is_some_and(Vec::is_empty);
    total > 0 && empty
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mismatch_requires_nonzero_count_and_empty_page() {
        assert!(count_mismatch(&json!({"total_count": 2, "items": []})));
        assert!(!count_mismatch(&json!({"total_count": 0, "items": []})));
        assert!(!count_mismatch(
            &json!({"total_count": 1, "items": [{"number": 1}]})
        ));
        assert!(!count_mismatch(&json!({"message": "throttled"})));
    }
}
