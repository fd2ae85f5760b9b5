//! Signed-URL capability issuer
//!
//! Time-boxed, scope-limited URLs signed with a per-account secret, so a
//! browser can download or upload without holding the account's real
//! credentials. The store verifies signatures server-side, which makes the
//! signed message a byte-exact wire contract.

use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::Serialize;
use sha1::Sha1;
use url::{Position, Url};

use crate::store::{Metadata, ObjectStore, StorageSession};

type HmacSha1 = Hmac<Sha1>;

const TEMP_URL_KEY_META: &str = "x-account-meta-temp-url-key";
const KEY_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const KEY_LENGTH: usize = 32;

/// Default lifetime of a download link.
pub const DOWNLOAD_TTL_SECONDS: i64 = 600;
/// Lifetime of an explicitly shared link.
pub const SHARE_TTL_SECONDS: i64 = 7 * 24 * 3600;
/// Lifetime of an upload-form policy.
pub const UPLOAD_FORM_TTL_SECONDS: i64 = 15 * 60;

const MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024 * 1024;
const MAX_UPLOAD_COUNT: u32 = 1;

/// Parameters for a browser form POSTing straight to the store.
#[derive(Debug, Clone, Serialize)]
pub struct UploadFormParams {
    pub swift_url: String,
    pub redirect_url: String,
    pub signature: String,
    pub expires: i64,
    pub max_file_size: u64,
    pub max_file_count: u32,
}

/// Sign `"<method>\n<expires>\n<path>"` with HMAC-SHA1, hex-encoded.
///
/// The path is the raw storage path as delivered to the store, never a
/// browser-escaped form.
pub fn sign(method: &str, path: &str, key: &str, expires: i64) -> String {
    hmac_hex(key, &format!("{method}\n{expires}\n{path}"))
}

fn hmac_hex(key: &str, message: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn generate_key() -> String {
    let mut rng = rand::rng();
    (0..KEY_LENGTH)
        .map(|_| KEY_CHARS[rng.random_range(0..KEY_CHARS.len())] as char)
        .collect()
}

/// Issues signed URLs on behalf of the session's account.
#[derive(Clone)]
pub struct TempUrlIssuer {
    store: Arc<dyn ObjectStore>,
}

impl TempUrlIssuer {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The account's signing key, provisioned on first use.
    ///
    /// Requires account-owner rights. Returns `None` when the key can
    /// neither be read nor stored; callers treat that as access denied.
    /// Two workers racing the first provisioning may each store a key;
    /// the last write wins and earlier links stay valid only briefly.
    pub async fn capability_key(&self, session: &StorageSession) -> Option<String> {
        let (metadata, _) = match self.store.get_account(session).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!("Cannot read account metadata: {}", e);
                return None;
            }
        };

        if let Some(key) = metadata.get(TEMP_URL_KEY_META).filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }

        let key = generate_key();
        let mut headers = Metadata::new();
        headers.insert(TEMP_URL_KEY_META.to_string(), key.clone());
        match self.store.post_account(session, headers).await {
            Ok(()) => Some(key),
            Err(e) => {
                tracing::error!("Cannot store temp url key: {}", e);
                None
            }
        }
    }

    /// A signed GET URL for one object, or `None` when no key is
    /// available.
    pub async fn download_url(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
        ttl_seconds: i64,
    ) -> Option<String> {
        let key = self.capability_key(session).await?;
        let parsed = match Url::parse(&session.storage_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Unparsable storage url {}: {}", session.storage_url, e);
                return None;
            }
        };

        let expires = Utc::now().timestamp() + ttl_seconds;
        let path = format!("{}/{container}/{object}", parsed.path());
        let base = &parsed[..Position::BeforePath];
        let signature = sign("GET", &path, &key, expires);
        Some(format!(
            "{base}{path}?temp_url_sig={signature}&temp_url_expires={expires}"
        ))
    }

    /// Signed FormPOST policy the browser submits directly to the store.
    ///
    /// `redirect_url` is where the store sends the browser afterwards and
    /// is part of the signed message.
    pub async fn upload_form_params(
        &self,
        session: &StorageSession,
        container: &str,
        prefix: Option<&str>,
        redirect_url: &str,
    ) -> Option<UploadFormParams> {
        let key = self.capability_key(session).await?;

        let mut swift_url = format!("{}/{container}/", session.storage_url);
        if let Some(prefix) = prefix {
            swift_url.push_str(prefix);
        }
        let parsed = match Url::parse(&swift_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Unparsable upload url {}: {}", swift_url, e);
                return None;
            }
        };

        let expires = Utc::now().timestamp() + UPLOAD_FORM_TTL_SECONDS;
        let message = format!(
            "{}\n{redirect_url}\n{MAX_UPLOAD_SIZE}\n{MAX_UPLOAD_COUNT}\n{expires}",
            parsed.path()
        );
        let signature = hmac_hex(&key, &message);

        Some(UploadFormParams {
            swift_url,
            redirect_url: redirect_url.to_string(),
            signature,
            expires,
            max_file_size: MAX_UPLOAD_SIZE,
            max_file_count: MAX_UPLOAD_COUNT,
        })
    }
}
