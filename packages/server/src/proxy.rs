//! Pass-through to the upstream tabular statistics API.
//!
//! Query bodies are forwarded unchanged except that the response format
//! is always forced to JSON. Successful responses can optionally be kept
//! in memory for [`CACHE_TTL`].

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::ServerError;

/// How long a cached upstream response stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Maximum length of an upstream error body forwarded to the client.
pub const BODY_PREVIEW_LEN: usize = 500;

/// Sets `response.format` to `"json"`, creating the object if needed.
///
/// Non-object bodies are left alone.
pub fn force_json_format(body: &mut Value) {
    let Some(object) = body.as_object_mut() else {
        return;
    };

    let response = object
        .entry("response")
        .or_insert_with(|| Value::Object(serde_json::Map::new()));
    if !response.is_object() {
        *response = Value::Object(serde_json::Map::new());
    }
    if let Some(response) = response.as_object_mut() {
        response.insert("format".to_string(), Value::String("json".to_string()));
    }
}

/// Cuts `text` to [`BODY_PREVIEW_LEN`] characters, marking the cut.
#[must_use]
pub fn truncate_body(text: &str) -> String {
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Joins the configured base URL and a table path.
#[must_use]
pub fn upstream_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Status and body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

impl UpstreamResponse {
    /// Whether the upstream reported success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Posts a query to the upstream API.
///
/// # Errors
///
/// Returns [`ServerError::Http`] if the request cannot be sent or the body
/// cannot be read. Non-success statuses are not errors here.
pub async fn forward(
    client: &reqwest::Client,
    url: &str,
    body: &Value,
) -> Result<UpstreamResponse, ServerError> {
    log::debug!("Proxying query to {url}");

    let resp = client.post(url).json(body).send().await?;
    let status = resp.status().as_u16();
    let body = resp.text().await?;

    if !(200..300).contains(&status) {
        log::warn!("Upstream {url} returned {status}: {}", truncate_body(&body));
    }

    Ok(UpstreamResponse { status, body })
}

struct CachedResponse {
    stored_at: Instant,
    body: String,
}

/// In-memory cache of successful upstream responses.
pub struct ProxyCache {
    ttl: Duration,
    entries: Mutex<BTreeMap<String, CachedResponse>>,
}

impl Default for ProxyCache {
    fn default() -> Self {
        Self::new(CACHE_TTL)
    }
}

impl ProxyCache {
    /// Creates an empty cache with the given entry lifetime.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Cache key for a path and (already rewritten) query body.
    #[must_use]
    pub fn key(path: &str, body: &Value) -> String {
        format!("{path}\n{body}")
    }

    /// Returns a fresh cached body, dropping it if it has expired.
    pub fn get(&self, key: &str, now: Instant) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = entries
            .get(key)
            .is_some_and(|entry| now.saturating_duration_since(entry.stored_at) >= self.ttl);
        if expired {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.body.clone())
    }

    /// Stores a body.
    pub fn insert(&self, key: String, body: String, now: Instant) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
        entries.insert(
            key,
            CachedResponse {
                stored_at: now,
                body,
            },
        );
    }
}
