//! Principals and role-based access requirements
//!
//! A principal's access tree is a nested JSON mapping whose shape is up to the
//! identity provider, for example:
//!
//! ```text
//! {"service": {"Photos": {"roles": ["Manager"], "permissions": ["View", "List"]}}}
//! ```
//!
//! An [`AccessRequirement`] walks that tree with an ordered list of
//! `(category, key)` lookups, then checks the required tokens against what it finds.
//! At each depth exactly one remaining category must be present in the current
//! mapping; none present means no access, more than one is an
//! [`Error::AmbiguousAccessPath`].
//!
//! The granted set at the reached node is its own keys plus every string in its
//! list values (or, if the lookup lands on a list, that list's strings).

use crate::error::{Error, Result};
use crate::properties::Properties;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Role or permission condition gating a resource or command
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequirement {
    /// Tokens to look for; `None` or empty means no restriction
    #[serde(default)]
    pub requires: Option<Vec<String>>,
    /// Require every token instead of any one
    #[serde(default)]
    pub match_all: bool,
    /// Ordered `(category, key)` lookups descending the access tree
    #[serde(default)]
    pub lookup: Vec<(String, String)>,
}

impl AccessRequirement {
    /// Requirement that everyone satisfies
    pub fn none() -> Self {
        Self::default()
    }

    /// Satisfied by holding any of `tokens`
    pub fn any_of<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            requires: Some(tokens.into_iter().map(Into::into).collect()),
            match_all: false,
            lookup: Vec::new(),
        }
    }

    /// Satisfied by holding all of `tokens`
    pub fn all_of<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            match_all: true,
            ..Self::any_of(tokens)
        }
    }

    /// Append a `(category, key)` lookup
    pub fn within(mut self, category: impl Into<String>, key: impl Into<String>) -> Self {
        self.lookup.push((category.into(), key.into()));
        self
    }

    /// True when no tokens are required and no lookup is needed
    pub fn is_unrestricted(&self) -> bool {
        self.required_tokens().is_none() && self.lookup.is_empty()
    }

    fn required_tokens(&self) -> Option<&[String]> {
        self.requires.as_deref().filter(|tokens| !tokens.is_empty())
    }
}

/// The authenticated actor whose access tree is checked
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    id: String,
    access: Value,
    #[serde(default)]
    properties: Properties,
}

impl Principal {
    /// Principal with an empty access tree
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            access: Value::Object(Map::new()),
            properties: Properties::new(),
        }
    }

    /// Principal with the given access tree, which must be a mapping
    pub fn with_access(id: impl Into<String>, access: Value) -> Result<Self> {
        let mut principal = Self::new(id);
        principal.set_access(access)?;
        Ok(principal)
    }

    /// Identifier (username, client id, ...)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current access tree
    pub fn access(&self) -> &Value {
        &self.access
    }

    /// Replace the access tree, e.g. after re-authentication
    pub fn set_access(&mut self, access: Value) -> Result<()> {
        if !access.is_object() {
            return Err(Error::InvalidAccessTree(json_kind(&access).to_string()));
        }
        self.access = access;
        Ok(())
    }

    /// Extra attributes
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Extra attributes, mutable
    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Check `requirement` against this principal's access tree
    pub fn has_access(&self, requirement: &AccessRequirement) -> Result<bool> {
        let Some(node) = self.descend(&self.access, &requirement.lookup)? else {
            return Ok(false);
        };

        let Some(required) = requirement.required_tokens() else {
            return Ok(true);
        };

        let granted = granted_tokens(node);
        let held = |token: &String| granted.contains(token.as_str());
        Ok(if requirement.match_all {
            required.iter().all(held)
        } else {
            required.iter().any(held)
        })
    }

    /// Negation of [`has_access`](Self::has_access), for hiding commands
    pub fn hide(&self, requirement: &AccessRequirement) -> Result<bool> {
        Ok(!self.has_access(requirement)?)
    }

    fn descend<'a>(
        &self,
        root: &'a Value,
        lookup: &[(String, String)],
    ) -> Result<Option<&'a Value>> {
        let mut remaining: Vec<&(String, String)> = lookup.iter().collect();
        let mut node = root;

        while !remaining.is_empty() {
            // Lists are leaves; a lookup can only end on one
            let Value::Object(level) = node else {
                return Ok(None);
            };

            let hits: Vec<usize> = remaining
                .iter()
                .enumerate()
                .filter(|(_, (category, _))| level.contains_key(category))
                .map(|(i, _)| i)
                .collect();

            let index = match hits.as_slice() {
                [] => return Ok(None),
                [index] => *index,
                _ => {
                    return Err(Error::AmbiguousAccessPath {
                        principal: self.id.clone(),
                        keys: hits.iter().map(|&i| remaining[i].0.clone()).collect(),
                    });
                }
            };

            let (category, key) = remaining.remove(index);
            let Some(next) = level.get(category).and_then(|c| c.get(key)) else {
                return Ok(None);
            };
            node = next;
        }

        Ok(Some(node))
    }
}

fn granted_tokens(node: &Value) -> HashSet<&str> {
    let mut granted = HashSet::new();
    match node {
        Value::Object(map) => {
            granted.extend(map.keys().map(String::as_str));
            for value in map.values() {
                if let Value::Array(items) = value {
                    granted.extend(items.iter().filter_map(Value::as_str));
                }
            }
        }
        Value::Array(items) => granted.extend(items.iter().filter_map(Value::as_str)),
        _ => {}
    }
    granted
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
