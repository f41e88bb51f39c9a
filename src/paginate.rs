//! Link-header pagination over the hosting API.
//!
//! The first page of a paged endpoint advertises the final page number in a
//! `Link` header (`rel="last"`). [`remaining_items`] follows that hint and
//! concatenates pages 2 through last, in page order, without deduplication.
//! Throttle retries are handled by the page fetcher itself, so a page that
//! still fails after the retry ceiling propagates as an error.

use crate::error::ApiError;
use reqwest::header::{HeaderMap, LINK};
use serde_json::Value;
use std::future::Future;

/// Which paged endpoint a body came from; search pages wrap their results in
/// an `items` envelope, list endpoints return bare arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Issue,
    Commit,
    Release,
}

impl ItemKind {
    /// Extracts the item list from a page body, or `None` when the body does
    /// not have the expected shape.
    pub fn items<'a>(&self, body: &'a Value) -> Option<&'a Vec<Value>> {
        match self {
            ItemKind::Issue => body.get("items")?.as_array(),
            ItemKind::Commit | ItemKind::Release => body.as_array(),
        }
    }
}

/// Fetches pages `2..=last` of a paged endpoint, calling `fetch_page` with an
/// explicit page number for each. Returns an empty list when the first page's
/// headers advertise no `rel="last"` link (single-page result; the caller
/// already holds page 1).
pub async fn remaining_items<F, Fut>(
    first_page_headers: &HeaderMap,
    kind: ItemKind,
    fetch_page: F,
) -> Result<Vec<Value>, ApiError>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<(Value, HeaderMap), ApiError>>,
{
    let Some(last) = last_page(first_page_headers) else {
        return Ok(Vec::new());
    };

    let mut all = Vec::new();
    for page in 2..=last {
        let (body, _) = fetch_page(page).await?;
        let items = kind.items(&body).ok_or(ApiError::DataUnavailable)?;
        all.extend(items.iter().cloned());
    }
    tracing::debug!(last_page = last, items = all.len(), "fetched remaining pages");
    Ok(all)
}

/// Reads the last page number from a response's `Link` header, if any.
pub fn last_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    extract_last_page(link)
}

/// Extracts the page number of the `rel="last"` link from a raw Link header.
fn extract_last_page(link_header: &str) -> Option<u32> {
    for link in link_header.split(',') {
        if !link.contains("rel=\"last\"") {
            continue;
        }
        // In `<https://...?q=...&per_page=100&page=7>; rel="last"` the page
        // parameter of interest is the final one in the URL.
        let target = link.split(';').next()?;
        let after = target.rsplit("page=").next()?;
        let digits: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        return digits.parse().ok();
    }
    None
}
