//! Subscription and event wire types, plus error definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Filter attached to one event category. An empty expression accepts all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub filtering: String,
}

impl Filter {
    /// The accept-everything filter.
    pub fn accept_all() -> Self {
        Self::default()
    }
}

/// Mapping from event category name to its filter expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryFilters(BTreeMap<String, Filter>);

impl CategoryFilters {
    /// Subscribe to every given category without filtering.
    pub fn accept_all<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            categories
                .into_iter()
                .map(|c| (c.into(), Filter::accept_all()))
                .collect(),
        )
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn get(&self, category: &str) -> Option<&Filter> {
        self.0.get(category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the feed delivers events to us. The feed only supports HTTP pushes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackType {
    #[default]
    #[serde(rename = "HTTP")]
    Http,
}

/// A subscription as exchanged with the feed API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Server-assigned identifier, empty until assigned.
    #[serde(default, skip_serializing_if = "String::is_empty", deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(default)]
    pub callback_url: String,

    #[serde(default)]
    pub callback_type: CallbackType,

    #[serde(default)]
    pub filters: CategoryFilters,
}

impl Subscription {
    /// Build an unfiltered subscription for the given categories.
    pub fn accept_all<I, S>(callback_url: impl Into<String>, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: String::new(),
            callback_url: callback_url.into(),
            callback_type: CallbackType::Http,
            filters: CategoryFilters::accept_all(categories),
        }
    }

    /// Attach an identifier assigned in an earlier run.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Merge a feed API reply into this record.
    ///
    /// Only fields present in the reply are overwritten. An empty reply body
    /// leaves the record untouched.
    pub fn apply_reply(&mut self, body: &str) -> Result<(), serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(());
        }
        let reply: SubscriptionReply = serde_json::from_str(body)?;
        if let Some(id) = reply.id {
            self.id = id;
        }
        if let Some(callback_url) = reply.callback_url {
            self.callback_url = callback_url;
        }
        if let Some(callback_type) = reply.callback_type {
            self.callback_type = callback_type;
        }
        if let Some(filters) = reply.filters {
            self.filters = filters;
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionReply {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    id: Option<String>,
    callback_url: Option<String>,
    callback_type: Option<CallbackType>,
    filters: Option<CategoryFilters>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_id(deserializer)?.unwrap_or_default())
}

fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    // The feed has sent identifiers both as strings and as bare numbers.
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "subscription id must be a string or number, got {}",
            other
        ))),
    }
}

/// Identity chain an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IdentityChainId {
    Hash {
        #[serde(rename = "Hash")]
        hash: String,
    },
    Text(String),
}

impl IdentityChainId {
    pub fn as_str(&self) -> &str {
        match self {
            IdentityChainId::Hash { hash } => hash,
            IdentityChainId::Text(s) => s,
        }
    }
}

/// A pushed feed event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Event {
    #[serde(default, rename = "identityChainID")]
    pub identity_chain_id: Option<IdentityChainId>,

    #[serde(default, rename = "streamSource")]
    pub stream_source: i32,

    /// Category name → payload.
    #[serde(default)]
    pub value: Option<Map<String, Value>>,

    /// Older feeds carry the category map here instead of `value`.
    #[serde(default)]
    pub event: Option<Map<String, Value>>,
}

impl Event {
    /// Parse a raw callback body.
    pub fn parse(body: &[u8]) -> Result<Self, EventError> {
        serde_json::from_slice(body).map_err(EventError::Malformed)
    }

    /// Category map, preferring `value` over the legacy `event` field.
    pub fn category_map(&self) -> Option<&Map<String, Value>> {
        self.value.as_ref().or(self.event.as_ref())
    }

    /// Category names carried by this event, in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.category_map()
            .into_iter()
            .flat_map(|m| m.keys().map(String::as_str))
    }
}

/// Errors decoding an inbound callback.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event payload: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Errors talking to the feed API.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Connection, timeout or body transfer failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The feed API answered with a non-success status.
    #[error("feed API returned {status}: {body}")]
    Server { status: u16, body: String },

    /// The feed API answered with a body we could not decode.
    #[error("malformed subscription reply: {0}")]
    Parse(#[from] serde_json::Error),

    /// The feed API accepted the request but assigned no identifier.
    #[error("feed API did not assign a subscription id")]
    MissingId,

    /// A request URL could not be built.
    #[error("invalid feed URL '{0}'")]
    InvalidUrl(String),
}

impl SubscriptionError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SubscriptionError::Transport(_) => "transport",
            SubscriptionError::Server { .. } => "server",
            SubscriptionError::Parse(_) => "parse",
            SubscriptionError::MissingId => "missing_id",
            SubscriptionError::InvalidUrl(_) => "invalid_url",
        }
    }
}
