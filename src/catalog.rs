//! Remote model catalog of an OpenAI-compatible endpoint.
//!
//! One GET per run, no cache, no retry. The listing endpoint is probed in
//! order (`{base}/v1/models`, then `{base}/models`) and the first
//! well-formed listing wins. Servers disagree on the response shape, so the
//! parser accepts the OpenAI `{"data": [...]}` envelope, a `{"models":
//! [...]}` envelope and a bare array.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, SyncError};

/// Request timeout for catalog calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Strip trailing slashes and a trailing `/v1` segment from a host URL.
///
/// `http://localhost:8080/v1/` and `http://localhost:8080` both normalize
/// to `http://localhost:8080`, so persisted entries and the `--host`
/// argument land in the same scope however the URL was written down.
pub fn normalize_base_url(host: &str) -> String {
    let mut base = host.trim_end_matches('/');
    if let Some(stripped) = base.strip_suffix("/v1") {
        base = stripped.trim_end_matches('/');
    }
    base.to_string()
}

/// The model ids advertised by the endpoint, in discovery order.
///
/// Non-empty by construction: an id-less listing is treated as a protocol
/// failure upstream, so a catalog in hand always carries at least one id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteCatalog {
    ids: Vec<String>,
}

impl RemoteCatalog {
    /// Build a catalog from raw ids, keeping discovery order and dropping
    /// duplicates (first occurrence wins).
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut catalog = Self::default();
        for id in ids {
            let id = id.into();
            if !catalog.ids.contains(&id) {
                catalog.ids.push(id);
            }
        }
        catalog
    }

    /// Whether the endpoint advertises `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    /// All ids in discovery order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Accepted listing shapes across OpenAI-compatible servers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawListing {
    /// OpenAI shape: `{"object": "list", "data": [...]}`.
    Data { data: Vec<RawEntry> },
    /// Ollama-era gateways: `{"models": [...]}`.
    Models { models: Vec<RawEntry> },
    /// Bare array of entries.
    Bare(Vec<RawEntry>),
}

/// A single listing entry; servers disagree on the id field's name.
#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Decode a listing body into a catalog.
///
/// Entries without an `id` fall back to `name`; entries with neither are
/// skipped. A body that decodes to zero ids is rejected so a misconfigured
/// host cannot masquerade as "every model vanished" and wipe the enabled
/// section downstream.
fn parse_listing(body: &str) -> Result<RemoteCatalog> {
    let listing: RawListing = serde_json::from_str(body)
        .map_err(|e| SyncError::Protocol(format!("not a model listing: {e}")))?;

    let entries = match listing {
        RawListing::Data { data } => data,
        RawListing::Models { models } => models,
        RawListing::Bare(entries) => entries,
    };

    let catalog = RemoteCatalog::from_ids(
        entries
            .into_iter()
            .filter_map(|entry| entry.id.or(entry.name)),
    );
    if catalog.is_empty() {
        return Err(SyncError::Protocol(
            "listing contained no model identifiers".to_string(),
        ));
    }
    Ok(catalog)
}

// ============================================================================
// Client
// ============================================================================

/// Client for the models listing of an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CatalogClient {
    /// Create a client for `host`; the host is normalized immediately.
    pub fn new(host: &str, api_key: Option<String>) -> Self {
        Self::with_timeout(host, api_key, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout (for testing against
    /// slow mock servers).
    pub fn with_timeout(host: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: normalize_base_url(host),
            api_key,
        }
    }

    /// The normalized base URL this client is scoped to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Candidate listing endpoints, most specific first.
    fn candidates(&self) -> [String; 2] {
        [
            format!("{}/v1/models", self.base_url),
            format!("{}/models", self.base_url),
        ]
    }

    /// Fetch the model catalog.
    ///
    /// Connection and timeout failures abort straight away; the host is
    /// down either way. An explicit 401 or 403 also aborts, because a bad
    /// credential on `/v1/models` would be just as bad on `/models`. Any
    /// other rejection moves on to the next candidate, and running out of
    /// candidates is a protocol error naming both attempts.
    pub async fn fetch(&self) -> Result<RemoteCatalog> {
        let mut last_failure: Option<String> = None;

        for url in self.candidates() {
            debug!(url = %url, "probing model listing");
            let mut request = self.http.get(&url);
            if let Some(ref key) = self.api_key {
                request = request.header("Authorization", format!("Bearer {key}"));
            }

            let response = request
                .send()
                .await
                .map_err(|e| SyncError::Network(format!("GET {url}: {e}")))?;

            let status = response.status();
            match status.as_u16() {
                401 | 403 => {
                    return Err(SyncError::Auth {
                        url,
                        status: status.as_u16(),
                    });
                }
                code if !status.is_success() => {
                    debug!(url = %url, status = code, "listing request rejected");
                    last_failure = Some(format!("{url} returned HTTP {code}"));
                    continue;
                }
                _ => {}
            }

            let body = response
                .text()
                .await
                .map_err(|e| SyncError::Network(format!("GET {url}: {e}")))?;

            match parse_listing(&body) {
                Ok(catalog) => {
                    info!(url = %url, count = catalog.len(), "fetched model catalog");
                    return Ok(catalog);
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "response is not a model listing");
                    last_failure = Some(format!("{url}: {e}"));
                }
            }
        }

        let detail = last_failure.unwrap_or_else(|| "no endpoint answered".to_string());
        Err(SyncError::Protocol(format!(
            "no model listing at {base}/v1/models or {base}/models: {detail}",
            base = self.base_url
        )))
    }
}
