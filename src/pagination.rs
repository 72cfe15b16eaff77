//! Paginated listing retrieval
//!
//! Listing endpoints answer `?page=N` with `{"results": [...], "count": total}`.
//! Page 1 is fetched directly; if it holds fewer items than `count`, the remaining
//! pages are requested as one batch. The page estimate overshoots the last page;
//! pages past the real end come back empty or as errors and contribute nothing.

use crate::access::{AccessRequirement, Principal};
use crate::batch::{BatchOptions, run_batch};
use crate::descriptor::{RequestDescriptor, RequestOptions};
use crate::error::Result;
use crate::session::{ResponseRecord, Session};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};

/// Body of one listing page
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    count: Option<u64>,
}

/// Descriptor for `page` of the listing at `base_url`
fn page_descriptor(base_url: &str, page: u64) -> Result<RequestDescriptor> {
    let mut options = RequestOptions::new();
    options.insert("params".to_string(), json!({ "page": page }));
    RequestDescriptor::new(base_url, options)
}

/// Upper bound on the pages one listing may span
pub(crate) const MAX_PAGES: u64 = 10_000;

/// Page numbers still to request after page 1 returned `page_len` of `count` items
///
/// Returns pages `2 .. ceil(count / page_len) + 2`, or nothing when that would
/// exceed [`MAX_PAGES`].
pub(crate) fn remaining_pages(count: u64, page_len: usize) -> std::ops::Range<u64> {
    let page_len = page_len as u64;
    if page_len == 0 || page_len >= count {
        return 2..2;
    }
    let pages = count.div_ceil(page_len);
    if pages > MAX_PAGES {
        tracing::warn!(
            count,
            page_len,
            max_pages = MAX_PAGES,
            "listing too large, stopping after page 1"
        );
        return 2..2;
    }
    2..pages.saturating_add(2)
}

fn parse_page(record: &ResponseRecord) -> Option<Page> {
    if record.is_error() {
        tracing::debug!(url = %record.target, status = record.status, "skipping failed page");
        return None;
    }
    match record.json::<Page>() {
        Ok(page) => Some(page),
        Err(e) => {
            tracing::warn!(url = %record.target, error = %e, "skipping unparsable page");
            None
        }
    }
}

/// Fetch every item of the listing at `base_url`
///
/// When `principal` is given and `requirement` restricts access, the check runs first
/// and a denial yields an empty list without any request being made. A failed
/// first page also yields an empty list; failed later pages are skipped.
pub async fn fetch_all<S>(
    session: &S,
    base_url: &str,
    principal: Option<&Principal>,
    requirement: &AccessRequirement,
    options: &BatchOptions,
) -> Result<Vec<Value>>
where
    S: Session + ?Sized,
{
    if let Some(principal) = principal
        && !requirement.is_unrestricted()
        && !principal.has_access(requirement)?
    {
        tracing::warn!(principal = principal.id(), url = base_url, "access denied, skipping fetch");
        return Ok(Vec::new());
    }

    let first = session.execute(Method::GET, &page_descriptor(base_url, 1)?).await?;
    let Some(Page { mut results, count }) = parse_page(&first) else {
        return Ok(Vec::new());
    };

    let count = count.unwrap_or(results.len() as u64);
    let pages = remaining_pages(count, results.len());
    if pages.is_empty() {
        return Ok(results);
    }

    tracing::debug!(
        url = base_url,
        count,
        page_len = results.len(),
        last_page = pages.end - 1,
        "fetching remaining pages"
    );

    let descriptors = pages
        .map(|page| page_descriptor(base_url, page))
        .collect::<Result<Vec<_>>>()?;
    let records = run_batch(session, Method::GET, descriptors, options).await?;

    // Records come back in page order
    for record in &records {
        if let Some(page) = parse_page(record) {
            results.extend(page.results);
        }
    }

    tracing::info!(url = base_url, items = results.len(), "listing fetched");
    Ok(results)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_pages_overshoots_by_two() {
        // 25 items, 10 per page: real pages 2..=3, requested 2..=4
        assert_eq!(remaining_pages(25, 10), 2..5);
        assert_eq!(remaining_pages(30, 10), 2..5);
        assert_eq!(remaining_pages(11, 10), 2..4);
    }

    #[test]
    fn test_remaining_pages_guards() {
        assert!(remaining_pages(10, 10).is_empty());
        assert!(remaining_pages(5, 10).is_empty());
        assert!(remaining_pages(25, 0).is_empty());
        assert!(remaining_pages(0, 0).is_empty());
    }

    #[test]
    fn test_remaining_pages_rejects_huge_counts() {
        assert!(remaining_pages(u64::MAX, 1).is_empty());
        assert!(remaining_pages(u64::MAX, usize::MAX).is_empty());
        assert!(remaining_pages(MAX_PAGES * 10 + 1, 10).is_empty());
        assert_eq!(remaining_pages(MAX_PAGES * 10, 10), 2..MAX_PAGES + 2);
    }

    #[test]
    fn test_page_descriptor_sets_page_param() {
        let d = page_descriptor("https://api.example.com/items", 3).unwrap();
        assert_eq!(d.query(), vec![("page".to_string(), "3".to_string())]);
    }

    #[test]
    fn test_parse_page_skips_errors_and_garbage() {
        let target = url::Url::parse("https://api.example.com/items").unwrap();
        let ok = ResponseRecord {
            target: target.clone(),
            status: 200,
            body: br#"{"results": [{"id": 1}], "count": 1}"#.to_vec(),
            headers: Default::default(),
        };
        let page = parse_page(&ok).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.count, Some(1));

        let not_found = ResponseRecord {
            status: 404,
            ..ok.clone()
        };
        assert!(parse_page(&not_found).is_none());

        let garbage = ResponseRecord {
            body: b"<html>".to_vec(),
            ..ok.clone()
        };
        assert!(parse_page(&garbage).is_none());

        let failure = ResponseRecord::transport_failure(target, "timed out");
        assert!(parse_page(&failure).is_none());
    }
}
