//! Backend aggregation endpoint: collects issue, pull-request, commit, and
//! release metadata for a repository over a rolling window, reshapes it into
//! monthly/weekly series, relays the record sets to the forecasting service,
//! and returns one merged payload.

pub mod aggregate;
pub mod collector;
pub mod config;
pub mod error;
pub mod forecast;
pub mod github;
pub mod normalize;
pub mod paginate;
pub mod windows;

use aggregate::{bucket_counts, Granularity};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{Months, NaiveDate, Utc};
use collector::MetadataCollector;
use config::AppConfig;
use error::ApiError;
use forecast::{to_records, ForecastClient, SeriesSet};
use github::GitHubClient;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(serde::Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Shared application state accessible to all request handlers.
pub struct AppState {
    pub github: GitHubClient,
    pub collector: MetadataCollector,
    pub forecast: ForecastClient,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let github = GitHubClient::new(&config)?;
        let collector = MetadataCollector::new(github.clone());
        let forecast = ForecastClient::new(&config)?;
        Ok(Self {
            github,
            collector,
            forecast,
            config,
        })
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/github", post(github_activity))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Request body of the aggregation endpoint. The boolean flags select a
/// summary variant; with none set the full pipeline runs. Each list variant
/// joins multiple repositories with its own delimiter.
#[derive(Debug, Deserialize)]
pub struct ActivityRequest {
    pub repository: String,
    /// Space-delimited list → star counts.
    #[serde(default)]
    pub starlist_status: bool,
    /// `$`-delimited list → fork counts.
    #[serde(default)]
    pub forklist_status: bool,
    /// `*`-delimited list → created-issue count per repository.
    #[serde(default)]
    pub linechart_status: bool,
    /// `@`-delimited list → open/closed issue counts per repository.
    #[serde(default)]
    pub stackbar_status: bool,
}

pub async fn github_activity(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActivityRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.starlist_status {
        let mut stars = Vec::new();
        for repo in request.repository.split_whitespace() {
            let summary = state.github.repo_summary(repo).await?;
            stars.push((repo.to_string(), summary.stargazers_count));
        }
        return Ok(Json(json!({ "starsCount": stars })));
    }

    if request.forklist_status {
        let mut forks = Vec::new();
        for repo in split_list(&request.repository, '$') {
            let summary = state.github.repo_summary(repo).await?;
            forks.push((repo.to_string(), summary.forks_count));
        }
        return Ok(Json(json!({ "forksCount": forks })));
    }

    if request.linechart_status {
        let range = recent_range(Utc::now().date_naive());
        let mut counts = Vec::new();
        for repo in split_list(&request.repository, '*') {
            let query = format!("repo:{repo} type:issue created:{}..{}", range.0, range.1);
            counts.push((repo.to_string(), state.collector.issue_count(&query).await?));
        }
        return Ok(Json(json!({ "lineChartCount": counts })));
    }

    if request.stackbar_status {
        let range = recent_range(Utc::now().date_naive());
        let mut counts = Vec::new();
        for repo in split_list(&request.repository, '@') {
            let base = format!("repo:{repo} type:issue created:{}..{}", range.0, range.1);
            let open = state
                .collector
                .issue_count(&format!("{base} state:open"))
                .await?;
            let closed = state
                .collector
                .issue_count(&format!("{base} state:closed"))
                .await?;
            counts.push((repo.to_string(), open, closed));
        }
        return Ok(Json(json!({ "stackBarCount": counts })));
    }

    let payload = run_pipeline(&state, &request.repository).await?;
    Ok(Json(payload))
}

/// The full aggregation-plus-forecast pipeline for one repository.
async fn run_pipeline(state: &AppState, repo: &str) -> Result<Value, ApiError> {
    let summary = state.github.repo_summary(repo).await?;

    let today = Utc::now().date_naive();
    let windows = windows::month_windows(today, state.config.window_months);
    let harvest = state.collector.collect_issues(repo, &windows, today).await?;
    let (issues, pulls) = normalize::split_issue_items(&harvest.items);
    tracing::debug!(
        repo,
        issues = issues.len(),
        pulls = pulls.len(),
        "collected and split issue items"
    );

    let commits = normalize::flatten_commits(&state.collector.collect_commits(repo).await?);
    let releases = normalize::flatten_releases(&state.collector.collect_releases(repo).await?);

    let fallback = (harvest.oldest, today);
    let created_dates: Vec<_> = issues.iter().map(|i| Some(i.created_at)).collect();
    let closed_dates: Vec<_> = issues.iter().map(|i| i.closed_at).collect();

    let created = bucket_counts(&created_dates, Granularity::Month, fallback);
    let closed = bucket_counts(&closed_dates, Granularity::Month, fallback);
    let week_closed = bucket_counts(&closed_dates, Granularity::Week, fallback);

    let sets = [
        SeriesSet {
            key: "createdAtImageUrls",
            series_type: "created_at",
            record_kind: None,
            records: to_records(&issues),
        },
        SeriesSet {
            key: "closedAtImageUrls",
            series_type: "closed_at",
            record_kind: None,
            records: to_records(&issues),
        },
        SeriesSet {
            key: "pulledAtImageUrls",
            series_type: "created_at",
            record_kind: Some("pull"),
            records: to_records(&pulls),
        },
        SeriesSet {
            key: "commitsImageUrls",
            series_type: "created_at",
            record_kind: Some("commit"),
            records: to_records(&commits),
        },
        SeriesSet {
            key: "releasesImageUrls",
            series_type: "created_at",
            record_kind: Some("release"),
            records: to_records(&releases),
        },
    ];
    let forecasts = state.forecast.relay_all(repo, &sets).await?;

    let mut payload = Map::new();
    payload.insert("created".into(), json!(created));
    payload.insert("closed".into(), json!(closed));
    payload.insert("weekClosed".into(), json!(week_closed));
    payload.insert("starCount".into(), json!(summary.stargazers_count));
    payload.insert("forkCount".into(), json!(summary.forks_count));
    for (label, body) in forecasts {
        payload.insert(label, body);
    }
    Ok(Value::Object(payload))
}

/// Splits a delimiter-joined repository list, dropping empty segments.
fn split_list(repositories: &str, delimiter: char) -> impl Iterator<Item = &str> {
    repositories
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The two-month range backing the line-chart and stacked-count summaries.
fn recent_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.checked_sub_months(Months::new(2)).unwrap_or(today);
    (start, today)
}
