//! Flattening of raw hosting-API items into the records the aggregator and
//! the forecasting service consume.
//!
//! Field casing on the serialized records (`State`, `Author`) is part of the
//! forecasting service's request contract and must not change.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// A flattened issue or pull request. Constructed once per raw item,
/// immutable thereafter, and never persisted beyond the request.
#[derive(Debug, Clone, Serialize)]
pub struct IssueRecord {
    pub issue_number: u64,
    pub created_at: NaiveDate,
    /// `None` means the issue is still open.
    pub closed_at: Option<NaiveDate>,
    pub labels: Vec<String>,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Author")]
    pub author: String,
}

/// A flattened commit; `created_at` is the author date.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRecord {
    pub sha: String,
    pub created_at: NaiveDate,
    #[serde(rename = "Author")]
    pub author: Option<String>,
}

/// A flattened release; `created_at` is the publish date, so unpublished
/// drafts are dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRecord {
    pub id: u64,
    pub created_at: NaiveDate,
    #[serde(rename = "Author")]
    pub author: Option<String>,
}

/// Splits raw search items into (issues, pull requests) and flattens both.
/// An item is a pull request iff its raw form carries a `pull_request`
/// marker; the split happens before any counting or bucketing.
pub fn split_issue_items(items: &[Value]) -> (Vec<IssueRecord>, Vec<IssueRecord>) {
    let mut issues = Vec::new();
    let mut pulls = Vec::new();
    for item in items {
        let Some(record) = flatten_issue(item) else {
            tracing::warn!("skipping search item with missing core fields");
            continue;
        };
        if item.get("pull_request").is_some() {
            pulls.push(record);
        } else {
            issues.push(record);
        }
    }
    (issues, pulls)
}

fn flatten_issue(item: &Value) -> Option<IssueRecord> {
    let labels = item
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|l| l.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(IssueRecord {
        issue_number: item.get("number")?.as_u64()?,
        created_at: date_only(item.get("created_at")?.as_str()?)?,
        closed_at: match item.get("closed_at") {
            None | Some(Value::Null) => None,
            Some(v) => Some(date_only(v.as_str()?)?),
        },
        labels,
        state: item.get("state")?.as_str()?.to_string(),
        author: item.get("user")?.get("login")?.as_str()?.to_string(),
    })
}

pub fn flatten_commits(items: &[Value]) -> Vec<CommitRecord> {
    items
        .iter()
        .filter_map(|item| {
            let commit = item.get("commit")?;
            Some(CommitRecord {
                sha: item.get("sha")?.as_str()?.to_string(),
                created_at: date_only(commit.get("author")?.get("date")?.as_str()?)?,
                author: commit
                    .pointer("/author/name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

pub fn flatten_releases(items: &[Value]) -> Vec<ReleaseRecord> {
    items
        .iter()
        .filter_map(|item| {
            Some(ReleaseRecord {
                id: item.get("id")?.as_u64()?,
                created_at: date_only(item.get("published_at")?.as_str()?)?,
                author: item
                    .pointer("/author/login")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .collect()
}

/// Truncates an ISO-8601 timestamp to its date-only component.
fn date_only(timestamp: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(timestamp.get(..10)?, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_item(number: u64, closed_at: Value, pull: bool) -> Value {
        let mut item = json!({
            "number": number,
            "created_at": "2024-03-05T11:22:33Z",
            "closed_at": closed_at,
            "labels": [{"name": "bug"}, {"name": "help wanted"}],
            "state": "open",
            "user": {"login": "octocat"}
        });
        if pull {
            item["pull_request"] = json!({"url": "https://x.test/pull/1"});
        }
        item
    }

    #[test]
    fn pull_request_marker_splits_before_counting() {
        let items = vec![
            issue_item(1, Value::Null, false),
            issue_item(2, Value::Null, true),
            issue_item(3, json!("2024-03-10T00:00:00Z"), false),
        ];
        let (issues, pulls) = split_issue_items(&items);

        assert_eq!(issues.len(), 2);
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].issue_number, 2);
        assert!(issues.iter().all(|i| i.issue_number != 2));
    }

    #[test]
    fn timestamps_truncate_to_dates_and_null_passes_through() {
        let (issues, _) = split_issue_items(&[issue_item(7, json!("2024-03-10T09:00:00Z"), false)]);
        let record = &issues[0];

        assert_eq!(record.created_at.to_string(), "2024-03-05");
        assert_eq!(record.closed_at.unwrap().to_string(), "2024-03-10");
        assert_eq!(record.labels, vec!["bug", "help wanted"]);
        assert_eq!(record.state, "open");
        assert_eq!(record.author, "octocat");

        let (open_issues, _) = split_issue_items(&[issue_item(8, Value::Null, false)]);
        assert!(open_issues[0].closed_at.is_none());
    }

    #[test]
    fn serialized_record_matches_forecast_contract() {
        let (issues, _) = split_issue_items(&[issue_item(9, Value::Null, false)]);
        let value = serde_json::to_value(&issues[0]).unwrap();

        assert_eq!(value["issue_number"], 9);
        assert_eq!(value["created_at"], "2024-03-05");
        assert_eq!(value["closed_at"], Value::Null);
        assert_eq!(value["State"], "open");
        assert_eq!(value["Author"], "octocat");
    }

    #[test]
    fn commits_flatten_from_nested_author_date() {
        let commits = flatten_commits(&[json!({
            "sha": "abc123",
            "commit": {"author": {"name": "Grace", "date": "2024-01-02T03:04:05Z"}}
        })]);
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha, "abc123");
        assert_eq!(commits[0].created_at.to_string(), "2024-01-02");
        assert_eq!(commits[0].author.as_deref(), Some("Grace"));
    }

    #[test]
    fn unpublished_releases_are_dropped() {
        let releases = flatten_releases(&[
            json!({"id": 1, "published_at": "2024-02-02T00:00:00Z", "author": {"login": "octocat"}}),
            json!({"id": 2, "published_at": null}),
        ]);
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].id, 1);
    }
}
