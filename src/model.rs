//! Model descriptors and the scoped registry state.
//!
//! A descriptor is one entry of a custom-model section in the settings
//! file: the map key is the model id, the value carries `baseUrl`,
//! `requiresAPIKey` and whatever else the editor or the user put there.
//! Unknown fields ride along verbatim so a sync never loses hand-tuned
//! token limits or tool flags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single custom-model entry, identified by `(base_url, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model identifier; lives in the section map key, not the entry body.
    #[serde(skip)]
    pub id: String,

    /// Endpoint base URL the model is served from.
    #[serde(rename = "baseUrl")]
    pub base_url: String,

    /// Whether the editor must attach an API key; absent means false.
    /// Kept optional so entries that never spelled it out stay that way.
    #[serde(
        rename = "requiresAPIKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub requires_api_key: Option<bool>,

    /// Every other editor-defined field, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelDescriptor {
    /// Create a descriptor with default (empty) editor parameters.
    pub fn new(id: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            requires_api_key: None,
            extra: Map::new(),
        }
    }

    /// Set the `requiresAPIKey` field explicitly.
    pub fn with_requires_api_key(mut self, required: bool) -> Self {
        self.requires_api_key = Some(required);
        self
    }

    /// Parse a settings entry; `id` is the map key the entry sits under.
    pub fn from_entry(id: &str, entry: &Value) -> serde_json::Result<Self> {
        let mut descriptor: Self = serde_json::from_value(entry.clone())?;
        descriptor.id = id.to_string();
        Ok(descriptor)
    }

    /// Serialize back to the settings entry shape (without the id).
    pub fn to_entry(&self) -> Value {
        serde_json::to_value(self).expect("descriptor serialization cannot fail")
    }
}

/// The slice of the settings registry scoped to one base URL.
///
/// Entries for other base URLs never appear here; the settings layer keeps
/// them as opaque passthrough.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryState {
    /// Normalized base URL this state was scoped to.
    pub base_url: String,
    /// Active entries, in document order.
    pub enabled: Vec<ModelDescriptor>,
    /// Disabled entries, in document order.
    pub disabled: Vec<ModelDescriptor>,
}
