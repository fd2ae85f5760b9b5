//! Storage types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Response headers and metadata of a store resource, keyed by lowercase
/// header name (`x-account-meta-*`, `x-container-meta-*`, `x-object-meta-*`,
/// `content-type`, `x-timestamp`, ...).
pub type Metadata = HashMap<String, String>;

/// An authenticated view onto one storage account.
///
/// Owned by the web layer (it arrives in request headers) and borrowed by
/// every core operation. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSession {
    /// Account storage endpoint, e.g. `http://127.0.0.1:8080/v1/AUTH_test`.
    pub storage_url: String,
    /// Opaque auth token sent as `X-Auth-Token`.
    pub auth_token: String,
    /// Username the session was authenticated as. Empty for anonymous
    /// (public container) access.
    pub username: String,
}

impl StorageSession {
    /// The account id is the trailing path segment of the storage endpoint.
    pub fn account(&self) -> &str {
        self.storage_url.rsplit('/').next().unwrap_or("")
    }
}

/// A container as returned by an account listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub bytes: u64,
}

/// An object record from a container listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// One entry of a container listing: either a plain object or a
/// common-prefix marker produced by a delimiter query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListEntry {
    Subdir { subdir: String },
    Object(ObjectEntry),
}

impl ListEntry {
    /// Name of the underlying object, or the common prefix.
    pub fn name(&self) -> &str {
        match self {
            ListEntry::Subdir { subdir } => subdir,
            ListEntry::Object(obj) => &obj.name,
        }
    }
}

/// Read the store's `x-timestamp` header as float seconds since epoch.
pub fn timestamp(metadata: &Metadata) -> Option<f64> {
    metadata.get("x-timestamp")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_account() {
        let session = StorageSession {
            storage_url: "http://127.0.0.1:8080/v1/AUTH_test".to_string(),
            auth_token: "tkn".to_string(),
            username: "test:tester".to_string(),
        };
        assert_eq!(session.account(), "AUTH_test");
    }

    #[test]
    fn test_list_entry_deserializes_both_shapes() {
        let raw = r#"[
            {"subdir": "photos/"},
            {"name": "photos/cat.png", "bytes": 17, "content_type": "image/png",
             "last_modified": "2024-05-01T12:00:00.000000", "hash": "abc"}
        ]"#;
        let entries: Vec<ListEntry> = serde_json::from_str(raw).unwrap();
        assert!(matches!(&entries[0], ListEntry::Subdir { subdir } if subdir == "photos/"));
        assert!(matches!(&entries[1], ListEntry::Object(o) if o.bytes == 17));
    }

    #[test]
    fn test_timestamp_parsing() {
        let mut meta = Metadata::new();
        assert_eq!(timestamp(&meta), None);
        meta.insert("x-timestamp".to_string(), "1400000000.50000".to_string());
        assert_eq!(timestamp(&meta), Some(1_400_000_000.5));
        meta.insert("x-timestamp".to_string(), "garbage".to_string());
        assert_eq!(timestamp(&meta), None);
    }
}
