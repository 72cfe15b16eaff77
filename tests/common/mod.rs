//! Shared helpers for api-gate integration tests

#[allow(dead_code)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;

use api_gate::HttpSession;
use api_gate::config::SessionConfig;
use wiremock::MockServer;

/// Hostname that passes URL validation; test clients resolve it to the mock server
#[allow(dead_code)]
pub const HOST: &str = "api.example.com";

/// Session whose client sends every request for [`HOST`] to `server`
#[allow(dead_code)]
pub fn session_for(server: &MockServer) -> HttpSession {
    session_with_config(server, SessionConfig::default())
}

/// Like [`session_for`] with explicit settings
#[allow(dead_code)]
pub fn session_with_config(server: &MockServer, config: SessionConfig) -> HttpSession {
    let client = reqwest::Client::builder()
        .resolve(HOST, *server.address())
        .build()
        .unwrap_or_else(|e| panic!("failed to build test client: {e}"));
    HttpSession::with_client(client, config)
}

/// Absolute URL for `path` on the mock server, addressed through [`HOST`]
pub fn url_for(server: &MockServer, path: &str) -> String {
    format!("http://{HOST}:{}{path}", server.address().port())
}
