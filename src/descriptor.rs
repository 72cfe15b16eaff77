//! Request descriptors and the normalizer that builds them
//!
//! Bulk calls accept several call shapes for convenience:
//!
//! - a bare URL string
//! - a mapping holding a `url` key plus option keys
//! - a sequence whose first element is the URL and whose remaining mappings are
//!   merged left-to-right into the options
//!
//! [`normalize`] turns any mix of these into [`RequestDescriptor`]s, preserving order.
//!
//! # Example
//!
//! ```
//! use api_gate::descriptor::{normalize, RawRequest};
//! use serde_json::json;
//!
//! let descriptors = normalize(vec![
//!     RawRequest::from("https://github.com"),
//!     RawRequest::from(json!(["https://github.com", {"params": {"page": 2}}])),
//!     RawRequest::from(json!({"url": "https://pypi.org", "json": {"name": "api-gate"}})),
//! ])
//! .unwrap();
//!
//! assert_eq!(descriptors.len(), 3);
//! assert_eq!(descriptors[1].query(), vec![("page".to_string(), "2".to_string())]);
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// Request parameters keyed by option name (`params`, `json`, `data`, `headers`, `timeout`, `stream`)
pub type RequestOptions = Map<String, Value>;

/// Whether URL validation raises or reports
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Validation {
    /// Return [`Error::InvalidTarget`] for a bad URL
    Raise,
    /// Return `Ok(false)` for a bad URL
    Report,
}

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Constant pattern, covered by the tests below
        #[allow(clippy::expect_used)]
        Regex::new(
            r"^(http://|https://)[a-z0-9]+([\-.][a-z0-9]+)*\.[a-z]{2,5}(:[0-9]{1,5})?(/.*)?$",
        )
        .expect("URL pattern must compile")
    })
}

/// Check that `url` is an absolute http(s) URL with a dotted host, optional port and path
///
/// # Examples
///
/// ```
/// use api_gate::descriptor::{is_valid_url, Validation};
///
/// assert!(is_valid_url("https://www.google.com", Validation::Report).unwrap());
/// assert!(!is_valid_url("google.com", Validation::Report).unwrap());
/// assert!(is_valid_url("google.com", Validation::Raise).is_err());
/// ```
pub fn is_valid_url(url: &str, mode: Validation) -> Result<bool> {
    if url_pattern().is_match(url) {
        return Ok(true);
    }
    match mode {
        Validation::Raise => Err(Error::InvalidTarget(url.to_string())),
        Validation::Report => Ok(false),
    }
}

/// One normalized outbound HTTP call
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    target: Url,
    options: RequestOptions,
}

impl RequestDescriptor {
    /// Build a descriptor, validating `target`
    pub fn new(target: &str, options: RequestOptions) -> Result<Self> {
        is_valid_url(target, Validation::Raise)?;
        let target = Url::parse(target).map_err(|_| Error::InvalidTarget(target.to_string()))?;
        Ok(Self { target, options })
    }

    /// Build a descriptor without options
    pub fn get(target: &str) -> Result<Self> {
        Self::new(target, RequestOptions::new())
    }

    /// The validated target URL
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// The raw options mapping
    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    /// Query string pairs from the `params` option
    pub fn query(&self) -> Vec<(String, String)> {
        string_pairs(self.options.get("params"))
    }

    /// JSON body from the `json` option
    pub fn json_body(&self) -> Option<&Value> {
        self.options.get("json")
    }

    /// Form body pairs from the `data` option
    pub fn form_body(&self) -> Option<Vec<(String, String)>> {
        self.options.get("data").map(|data| string_pairs(Some(data)))
    }

    /// Extra headers from the `headers` option
    pub fn headers(&self) -> Vec<(String, String)> {
        string_pairs(self.options.get("headers"))
    }

    /// Per-call timeout from the `timeout` option, in seconds
    ///
    /// Values that are not positive or do not fit a [`Duration`] are ignored.
    pub fn timeout(&self) -> Option<Duration> {
        self.options
            .get("timeout")
            .and_then(Value::as_f64)
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// The `stream` flag (bodies are buffered regardless)
    pub fn stream(&self) -> bool {
        self.options
            .get("stream")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Flatten an options mapping into key/value pairs
///
/// A list value repeats its key once per element; nulls are dropped.
fn string_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter_map(scalar_text)
                    .map(|text| (key.clone(), text)),
            ),
            other => pairs.extend(scalar_text(other).map(|text| (key.clone(), text))),
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A call in any of the accepted input shapes
#[derive(Clone, Debug)]
pub enum RawRequest {
    /// Already normalized
    Descriptor(RequestDescriptor),
    /// Bare URL
    Url(String),
    /// Mapping with a `url` key; remaining keys become options
    Mapping(Map<String, Value>),
    /// URL followed by option mappings
    Sequence(Vec<Value>),
    /// Anything else; always rejected
    Other(Value),
}

impl From<RequestDescriptor> for RawRequest {
    fn from(descriptor: RequestDescriptor) -> Self {
        RawRequest::Descriptor(descriptor)
    }
}

impl From<&str> for RawRequest {
    fn from(url: &str) -> Self {
        RawRequest::Url(url.to_string())
    }
}

impl From<String> for RawRequest {
    fn from(url: String) -> Self {
        RawRequest::Url(url)
    }
}

impl From<(String, RequestOptions)> for RawRequest {
    fn from((url, options): (String, RequestOptions)) -> Self {
        RawRequest::Sequence(vec![Value::String(url), Value::Object(options)])
    }
}

impl From<Value> for RawRequest {
    fn from(value: Value) -> Self {
        match value {
            Value::String(url) => RawRequest::Url(url),
            Value::Object(map) => RawRequest::Mapping(map),
            Value::Array(items) => RawRequest::Sequence(items),
            other => RawRequest::Other(other),
        }
    }
}

/// Normalize heterogeneous calls into descriptors, in input order
pub fn normalize<I, R>(requests: I) -> Result<Vec<RequestDescriptor>>
where
    I: IntoIterator<Item = R>,
    R: Into<RawRequest>,
{
    requests
        .into_iter()
        .enumerate()
        .map(|(index, raw)| normalize_one(index, raw.into()))
        .collect()
}

fn normalize_one(index: usize, raw: RawRequest) -> Result<RequestDescriptor> {
    let shape_error = |reason: String| Error::InvalidRequestShape { index, reason };

    let (url, options) = match raw {
        RawRequest::Descriptor(descriptor) => return Ok(descriptor),
        RawRequest::Url(url) => (url, RequestOptions::new()),
        RawRequest::Mapping(mut map) => {
            let url = match map.remove("url") {
                Some(Value::String(url)) if !url.is_empty() => url,
                Some(_) => return Err(shape_error("the url key must hold a URL string".into())),
                None => return Err(shape_error("mapping is missing the url key".into())),
            };
            (url, map)
        }
        RawRequest::Sequence(items) => {
            let mut items = items.into_iter();
            let url = match items.next() {
                Some(Value::String(url)) => url,
                Some(other) => {
                    return Err(shape_error(format!("first element must be a URL, got {other}")));
                }
                None => return Err(shape_error("sequence is empty".into())),
            };
            let mut options = RequestOptions::new();
            for item in items {
                if let Value::Object(extra) = item {
                    options.extend(extra);
                }
            }
            (url, options)
        }
        RawRequest::Other(value) => {
            return Err(shape_error(format!("unable to iterate {value} to set request")));
        }
    };

    if !is_valid_url(&url, Validation::Report)? {
        return Err(shape_error(format!("invalid URL {url}")));
    }
    RequestDescriptor::new(&url, options).map_err(|e| shape_error(e.to_string()))
}
