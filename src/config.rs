//! Configuration management for the swiftdeck server
//!
//! Every component receives its configuration explicitly; there is no
//! global settings object. Values come from environment variables with
//! defaults matching a local Swift-all-in-one deployment.

use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub swift: SwiftConfig,
    pub thumbnails: ThumbnailConfig,
    pub trash: TrashConfig,
    pub alias: AliasConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwiftConfig {
    /// Auth endpoint credentials are exchanged against.
    pub auth_url: String,
    pub auth_version: u8,
    /// Root under which public (anonymous) account listings are reachable,
    /// e.g. `http://127.0.0.1:8080/v1/`.
    pub public_storage_root: String,
}

/// Credentials and shape of the dedicated thumbnail-service account.
#[derive(Debug, Clone, Deserialize)]
pub struct ThumbnailConfig {
    pub username: String,
    pub auth_key: String,
    /// Target box; thumbnails fit inside while keeping aspect ratio.
    pub width: u32,
    pub height: u32,
    /// `X-Delete-After` applied to stored thumbnails.
    pub ttl_seconds: u64,
}

/// Credentials for the dedicated trash-service account.
#[derive(Debug, Clone, Deserialize)]
pub struct TrashConfig {
    pub username: String,
    pub auth_key: String,
    /// `X-Delete-After` applied to trash entries; expiry is enforced by
    /// the store, never swept by this application.
    pub ttl_seconds: u64,
}

/// Deployment convention for deduplicating alias containers: an alias is
/// named `<prefix>_<prefix>_<realname>`, so the canonical name is the
/// alias name with the first `strip_segments` underscore-delimited
/// segments removed.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasConfig {
    pub strip_segments: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            swift: SwiftConfig {
                auth_url: "http://127.0.0.1:8080/auth/v1.0".to_string(),
                auth_version: 1,
                public_storage_root: "http://127.0.0.1:8080/v1/".to_string(),
            },
            thumbnails: ThumbnailConfig {
                username: "sw_thumbnails:sw_thumbnails".to_string(),
                auth_key: "sw_thumbnails".to_string(),
                width: 256,
                height: 256,
                ttl_seconds: 3600,
            },
            trash: TrashConfig {
                username: "sw_trash:sw_trash".to_string(),
                auth_key: "sw_trash".to_string(),
                ttl_seconds: 3600,
            },
            alias: AliasConfig { strip_segments: 2 },
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: var_or("SERVER_HOST", &defaults.server.host),
                port: parse_or("SERVER_PORT", defaults.server.port),
            },
            swift: SwiftConfig {
                auth_url: var_or("SWIFT_AUTH_URL", &defaults.swift.auth_url),
                auth_version: parse_or("SWIFT_AUTH_VERSION", defaults.swift.auth_version),
                public_storage_root: var_or(
                    "STORAGE_URL",
                    &defaults.swift.public_storage_root,
                ),
            },
            thumbnails: ThumbnailConfig {
                username: var_or("THUMBNAIL_USER", &defaults.thumbnails.username),
                auth_key: var_or("THUMBNAIL_AUTH_KEY", &defaults.thumbnails.auth_key),
                width: parse_or("THUMBNAIL_WIDTH", defaults.thumbnails.width),
                height: parse_or("THUMBNAIL_HEIGHT", defaults.thumbnails.height),
                ttl_seconds: parse_or("THUMBNAIL_TTL", defaults.thumbnails.ttl_seconds),
            },
            trash: TrashConfig {
                username: var_or("TRASH_USER", &defaults.trash.username),
                auth_key: var_or("TRASH_AUTH_KEY", &defaults.trash.auth_key),
                ttl_seconds: parse_or("TRASH_TTL", defaults.trash.ttl_seconds),
            },
            alias: AliasConfig {
                strip_segments: parse_or("ALIAS_STRIP_SEGMENTS", defaults.alias.strip_segments),
            },
        }
    }
}
