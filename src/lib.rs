//! # api-gate
//!
//! Helpers for command-line tools that talk to REST-style JSON APIs.
//!
//! ## What it does
//!
//! - **Role gating** - check a [`Principal`]'s nested access tree against an
//!   [`AccessRequirement`], e.g. to hide commands or skip fetching a resource
//! - **Bulk requests** - run many calls with a concurrency cap and progress reporting,
//!   results in input order, transport failures returned as data
//! - **Re-authentication** - sessions with an [`Authenticator`] refresh once and retry
//!   once on a 401, with a single refresh shared by concurrent calls
//! - **Cached listings** - walk paginated `{results, count}` endpoints and keep the
//!   result in a TTL-gated JSON file
//! - **Console output** - render values, responses and markdown for the terminal
//!
//! ## Quick Start
//!
//! ```no_run
//! use api_gate::{BatchOptions, HttpSession, Method, bulk};
//! use api_gate::config::SessionConfig;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = HttpSession::new(SessionConfig::default())?;
//!
//!     let responses = bulk(
//!         &session,
//!         Method::GET,
//!         vec![
//!             json!("https://api.example.com/users"),
//!             json!(["https://api.example.com/users", {"params": {"page": 2}}]),
//!             json!({"url": "https://api.example.com/teams"}),
//!         ],
//!         &BatchOptions::default(),
//!     )
//!     .await?;
//!
//!     for response in responses {
//!         println!("{} -> {}", response.target, response.status);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Principals and access requirements
pub mod access;
/// Bounded-concurrency batch execution
pub mod batch;
/// TTL file cache
pub mod cache;
/// Configuration types
pub mod config;
/// Request descriptors and normalization
pub mod descriptor;
/// Error types
pub mod error;
/// Markdown snippet builders
pub mod markdown;
/// Cache-backed resource models
pub mod model;
/// Console output rendering
pub mod output;
/// Paginated listing retrieval
pub mod pagination;
/// Property bag
pub mod properties;
/// HTTP sessions and the resilient executor
pub mod session;
/// Last-checked timestamp store
pub mod throttle;

// Re-export commonly used types
pub use access::{AccessRequirement, Principal};
pub use batch::{BatchOptions, LogProgress, ProgressSink, SilentProgress, bulk, run_batch};
pub use cache::{CacheState, FileCache};
pub use config::Config;
pub use descriptor::{RawRequest, RequestDescriptor, RequestOptions, normalize};
pub use error::{Error, Result};
pub use model::{Model, ResourceDefinition};
pub use output::{ConsoleSink, Output, OutputSink, echo};
pub use pagination::fetch_all;
pub use properties::Properties;
pub use reqwest::Method;
pub use session::{
    Authenticator, HttpSession, ResponseRecord, Session, TRANSPORT_FAILURE_STATUS,
};
pub use throttle::CheckStore;
