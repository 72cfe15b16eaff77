//! Cache-backed resource models
//!
//! A [`ResourceDefinition`] describes one remote listing: where it lives, who may
//! refresh it, how long a local copy stays good and which field identifies an item.
//! [`Model::load`] resolves it into items, going to the network only when the local
//! cache is missing or stale.
//!
//! # Example
//!
//! ```no_run
//! use api_gate::{AccessRequirement, BatchOptions, HttpSession, Model, ResourceDefinition};
//! use api_gate::config::SessionConfig;
//! use std::path::PathBuf;
//!
//! struct Projects;
//!
//! impl ResourceDefinition for Projects {
//!     fn url(&self) -> &str {
//!         "https://api.example.com/projects"
//!     }
//!     fn key_identifier(&self) -> &str {
//!         "name"
//!     }
//!     fn cache_path(&self) -> Option<PathBuf> {
//!         Some(PathBuf::from("~/.my-cli/projects.json"))
//!     }
//!     fn requirement(&self) -> AccessRequirement {
//!         AccessRequirement::any_of(["developer", "admin"])
//!     }
//! }
//!
//! # async fn example() -> api_gate::Result<()> {
//! let session = HttpSession::new(SessionConfig::default())?;
//! let projects = Model::load(&Projects, &session, None, &BatchOptions::default()).await?;
//! for name in projects.choices() {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::access::{AccessRequirement, Principal};
use crate::batch::BatchOptions;
use crate::cache::FileCache;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::pagination::fetch_all;
use crate::session::Session;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Description of a remote listing
pub trait ResourceDefinition: Send + Sync {
    /// Listing endpoint
    fn url(&self) -> &str;

    /// Item field used to group and look up items, e.g. `"name"`
    fn key_identifier(&self) -> &str;

    /// How long the local copy stays fresh; `None` uses [`CacheConfig::default_ttl`]
    fn ttl(&self) -> Option<Duration> {
        None
    }

    /// Where the local copy lives; `None` disables caching
    fn cache_path(&self) -> Option<PathBuf> {
        None
    }

    /// Who may refresh the listing
    fn requirement(&self) -> AccessRequirement {
        AccessRequirement::none()
    }
}

/// Items of a listing, grouped by key identifier
#[derive(Clone, Debug, Default)]
pub struct Model {
    items: Vec<Value>,
    choices: Vec<String>,
    index: HashMap<String, usize>,
}

impl Model {
    /// Load `definition` from cache or remote with the default cache settings
    pub async fn load<D, S>(
        definition: &D,
        session: &S,
        principal: Option<&Principal>,
        options: &BatchOptions,
    ) -> Result<Self>
    where
        D: ResourceDefinition + ?Sized,
        S: Session + ?Sized,
    {
        Self::load_with(definition, session, principal, options, &CacheConfig::default()).await
    }

    /// Load `definition` from cache or remote
    ///
    /// Definitions without their own TTL use `cache.default_ttl()`.
    pub async fn load_with<D, S>(
        definition: &D,
        session: &S,
        principal: Option<&Principal>,
        options: &BatchOptions,
        cache: &CacheConfig,
    ) -> Result<Self>
    where
        D: ResourceDefinition + ?Sized,
        S: Session + ?Sized,
    {
        let requirement = definition.requirement();
        let fetch = || fetch_all(session, definition.url(), principal, &requirement, options);

        let items = match definition.cache_path() {
            Some(path) => {
                let ttl = definition.ttl().unwrap_or_else(|| cache.default_ttl());
                FileCache::new(path, ttl)
                    .get_or_refresh(fetch)
                    .await?
            }
            None => fetch().await?,
        };

        Ok(Self::from_items(items, definition.key_identifier()))
    }

    /// Group `items` by the `key` field
    ///
    /// Items without the field are kept in [`all`](Self::all) but cannot be looked up.
    /// When keys repeat, lookups return the last item with that key.
    pub fn from_items(items: Vec<Value>, key: &str) -> Self {
        let mut choices = Vec::with_capacity(items.len());
        let mut index = HashMap::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            let Some(id) = item.get(key).and_then(key_string) else {
                tracing::debug!(key, position = i, "item has no key identifier");
                continue;
            };
            choices.push(id.clone());
            index.insert(id, i);
        }

        Self {
            items,
            choices,
            index,
        }
    }

    /// Every item, in listing order
    pub fn all(&self) -> &[Value] {
        &self.items
    }

    /// Key identifiers in listing order, e.g. for a CLI choice prompt
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    /// Item whose key identifier is `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the listing is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
