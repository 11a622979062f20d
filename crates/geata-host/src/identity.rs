//! Client Identity
//!
//! The one-time `nvim_set_client_info` advertisement sent to the editor
//! after the connection is established.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Version advertised to the editor; an unset version serializes as an
/// empty dictionary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

/// Identity sent to the peer exactly once during the handshake.
#[derive(Debug, Clone, Serialize)]
pub struct ClientIdentity {
    /// Display name shown by `:checkhealth` and friends
    pub name: String,

    pub version: ClientVersion,

    /// Callable methods advertised to the editor; empty until populated by
    /// the embedding application
    pub methods: BTreeMap<String, Value>,

    /// Free-form attributes (license, website, ...)
    pub attributes: BTreeMap<String, String>,
}

impl ClientIdentity {
    /// Default identity for a geata-hosted plugin.
    pub fn host_default() -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("license".to_string(), "MIT".to_string());
        attributes.insert("website".to_string(), "github.com/geilt/geata".to_string());
        Self {
            name: "geata-host".to_string(),
            version: ClientVersion::default(),
            methods: BTreeMap::new(),
            attributes,
        }
    }

    /// Positional parameters of the `nvim_set_client_info` call.
    pub fn to_params(&self) -> Value {
        serde_json::json!([
            &self.name,
            &self.version,
            "remote",
            &self.methods,
            &self.attributes
        ])
    }
}
