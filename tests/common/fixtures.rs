//! Mock listing endpoints

use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Items `{"id": n, "name": "item-n"}` for `ids`
pub fn items(ids: std::ops::Range<u64>) -> Vec<Value> {
    ids.map(|id| json!({"id": id, "name": format!("item-{id}")}))
        .collect()
}

/// Serve `total` items at `route` in pages of `page_size`; pages past the end return 404
pub async fn mount_listing(server: &MockServer, route: &str, total: u64, page_size: u64) {
    let pages = total.div_ceil(page_size);
    for page in 1..=pages {
        let start = (page - 1) * page_size;
        let end = (start + page_size).min(total);
        Mock::given(method("GET"))
            .and(path(route))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": items(start..end), "count": total})),
            )
            .with_priority(1)
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Invalid page."})),
        )
        .with_priority(2)
        .mount(server)
        .await;
}

/// Number of requests `server` has seen so far
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}
