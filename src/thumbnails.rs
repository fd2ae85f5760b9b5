//! Thumbnail cache manager
//!
//! Thumbnails are derived artifacts stored in a dedicated service account,
//! one container per source account, named
//! `<original_container>_<object_name>`. Freshness is a timestamp
//! comparison between the source object and the cached artifact; stale or
//! missing artifacts are regenerated before serving. Alias containers
//! resolve to their canonical account first so equivalent containers share
//! one cache entry.
//!
//! Concurrent viewers of the same stale object may both regenerate; the
//! writes land on the same cache key, so the duplication is wasted work,
//! not a correctness problem.

use std::io::Cursor;
use std::sync::Arc;

use image::imageops::FilterType;
use image::ImageFormat;

use crate::alias::resolve_origin;
use crate::config::{AliasConfig, Config, ThumbnailConfig};
use crate::error::{AppError, Result};
use crate::store::{timestamp, Metadata, ObjectStore, StorageSession};

const DELETE_AFTER_HEADER: &str = "x-delete-after";

#[derive(Clone)]
pub struct ThumbnailService {
    store: Arc<dyn ObjectStore>,
    auth_url: String,
    auth_version: u8,
    config: ThumbnailConfig,
    alias: AliasConfig,
}

impl ThumbnailService {
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            store,
            auth_url: config.swift.auth_url.clone(),
            auth_version: config.swift.auth_version,
            config: config.thumbnails.clone(),
            alias: config.alias.clone(),
        }
    }

    /// Username of the thumbnail service account, for ownership guards.
    pub fn service_username(&self) -> &str {
        &self.config.username
    }

    /// Serve the thumbnail for `container/object`, regenerating it first
    /// when it is missing or older than the source object.
    ///
    /// Returns `(content_type, bytes)`. A source object that cannot be
    /// read is fatal; a failed regeneration is not, as long as some cached
    /// artifact remains fetchable.
    pub async fn serve(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(String, Vec<u8>)> {
        let source_meta = self
            .store
            .head_object(session, container, object)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot head object {} of container {}: {}",
                    object,
                    container,
                    e
                );
                AppError::Upstream(format!("cannot read source object {container}/{object}"))
            })?;
        let source_ts = timestamp(&source_meta).ok_or_else(|| {
            AppError::Upstream(format!("source object {container}/{object} has no timestamp"))
        })?;

        let origin = resolve_origin(self.store.as_ref(), session, container, &self.alias)
            .await
            .map_err(|e| {
                AppError::Upstream(format!("cannot resolve origin of {container}: {e}"))
            })?;

        let thumb_session = self
            .store
            .authenticate(
                &self.auth_url,
                &self.config.username,
                &self.config.auth_key,
                self.auth_version,
            )
            .await
            .map_err(|e| {
                tracing::error!("Thumbnail service authentication failed: {}", e);
                AppError::Upstream("thumbnail service unavailable".to_string())
            })?;

        let thumb_name = format!("{}_{}", origin.container, object);
        let fresh = match self
            .store
            .head_object(&thumb_session, &origin.account, &thumb_name)
            .await
        {
            Ok(meta) => timestamp(&meta).is_some_and(|cached_ts| cached_ts >= source_ts),
            Err(_) => false,
        };

        if !fresh {
            self.regenerate(session, &thumb_session, &origin.account, container, object, &thumb_name)
                .await;
        }

        let (meta, content) = self
            .store
            .get_object(&thumb_session, &origin.account, &thumb_name)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot get object {} of container {}: {}",
                    thumb_name,
                    origin.account,
                    e
                );
                AppError::Upstream(format!("no thumbnail available for {container}/{object}"))
            })?;
        let content_type = meta
            .get("content-type")
            .cloned()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Ok((content_type, content))
    }

    /// Rebuild the cached artifact. Failures are logged, never raised; the
    /// final fetch in [`serve`](Self::serve) decides whether the request
    /// still succeeds.
    async fn regenerate(
        &self,
        session: &StorageSession,
        thumb_session: &StorageSession,
        account: &str,
        container: &str,
        object: &str,
        thumb_name: &str,
    ) {
        if self
            .store
            .head_container(thumb_session, account)
            .await
            .is_err()
        {
            if let Err(e) = self.store.put_container(thumb_session, account).await {
                tracing::error!("Cannot put container {}: {}", account, e);
                return;
            }
        }

        let (metadata, content) = match self.store.get_object(session, container, object).await {
            Ok(source) => source,
            Err(e) => {
                tracing::error!(
                    "Cannot create thumbnail for image {}. Could not retrieve the image from storage: {}",
                    object,
                    e
                );
                return;
            }
        };

        let content_type = metadata.get("content-type").cloned().unwrap_or_default();
        let Some(format) = ImageFormat::from_mime_type(&content_type) else {
            tracing::error!(
                "Cannot create thumbnail for image {}. Unsupported content type {}",
                object,
                content_type
            );
            return;
        };

        let source = match image::load_from_memory(&content) {
            Ok(image) => image,
            Err(e) => {
                tracing::error!("Cannot create thumbnail for image {}: {}", object, e);
                return;
            }
        };

        let resized = source.resize(self.config.width, self.config.height, FilterType::Lanczos3);
        let mut output = Cursor::new(Vec::new());
        if let Err(e) = resized.write_to(&mut output, format) {
            tracing::error!("Cannot create thumbnail for image {}: {}", object, e);
            return;
        }

        let mut headers = Metadata::new();
        headers.insert(
            DELETE_AFTER_HEADER.to_string(),
            self.config.ttl_seconds.to_string(),
        );
        if let Err(e) = self
            .store
            .put_object(
                thumb_session,
                account,
                thumb_name,
                output.into_inner(),
                Some(&content_type),
                headers,
            )
            .await
        {
            tracing::error!(
                "Cannot create thumbnail for image {}. Could not put thumbnail to storage: {}",
                object,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, ObjectStore};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::DynamicImage::new_rgb8(width, height);
        let mut output = Cursor::new(Vec::new());
        image.write_to(&mut output, ImageFormat::Png).unwrap();
        output.into_inner()
    }

    async fn setup() -> (Arc<MemoryStore>, ThumbnailService, StorageSession) {
        let store = Arc::new(MemoryStore::new());
        let mut config = Config::default();
        config.thumbnails.width = 32;
        config.thumbnails.height = 32;
        let service = ThumbnailService::new(store.clone(), &config);
        let session = store
            .authenticate("memory://auth", "test:tester", "secret", 1)
            .await
            .unwrap();
        store.put_container(&session, "photos").await.unwrap();
        (store, service, session)
    }

    async fn thumb_session(store: &MemoryStore) -> StorageSession {
        store
            .authenticate(
                "memory://auth",
                "sw_thumbnails:sw_thumbnails",
                "sw_thumbnails",
                1,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_serve_generates_and_caches() {
        let (store, service, session) = setup().await;
        store
            .put_object(
                &session,
                "photos",
                "cat.png",
                png_bytes(128, 64),
                Some("image/png"),
                Metadata::new(),
            )
            .await
            .unwrap();

        let (content_type, bytes) = service.serve(&session, "photos", "cat.png").await.unwrap();
        assert_eq!(content_type, "image/png");
        let thumbnail = image::load_from_memory(&bytes).unwrap();
        // Fits the 32x32 box, aspect ratio preserved.
        assert_eq!(thumbnail.width(), 32);
        assert_eq!(thumbnail.height(), 16);

        // The artifact landed in the service account under the source
        // account's name, tagged for expiry.
        let thumbs = thumb_session(&store).await;
        let meta = store
            .head_object(&thumbs, "AUTH_test", "photos_cat.png")
            .await
            .unwrap();
        assert_eq!(meta.get("x-delete-after").unwrap(), "3600");
    }

    #[tokio::test]
    async fn test_serve_reuses_fresh_artifact() {
        let (store, service, session) = setup().await;
        store
            .put_object(
                &session,
                "photos",
                "cat.png",
                png_bytes(64, 64),
                Some("image/png"),
                Metadata::new(),
            )
            .await
            .unwrap();
        service.serve(&session, "photos", "cat.png").await.unwrap();

        let thumbs = thumb_session(&store).await;
        let before = store
            .head_object(&thumbs, "AUTH_test", "photos_cat.png")
            .await
            .unwrap();

        // Source unchanged: the cached artifact must not be rewritten.
        service.serve(&session, "photos", "cat.png").await.unwrap();
        let after = store
            .head_object(&thumbs, "AUTH_test", "photos_cat.png")
            .await
            .unwrap();
        assert_eq!(before.get("x-timestamp"), after.get("x-timestamp"));
    }

    #[tokio::test]
    async fn test_serve_regenerates_stale_artifact() {
        let (store, service, session) = setup().await;
        store
            .put_object(
                &session,
                "photos",
                "cat.png",
                png_bytes(64, 64),
                Some("image/png"),
                Metadata::new(),
            )
            .await
            .unwrap();
        service.serve(&session, "photos", "cat.png").await.unwrap();

        let thumbs = thumb_session(&store).await;
        let before = store
            .head_object(&thumbs, "AUTH_test", "photos_cat.png")
            .await
            .unwrap();

        // Overwriting the source makes the cached artifact stale.
        store
            .put_object(
                &session,
                "photos",
                "cat.png",
                png_bytes(48, 24),
                Some("image/png"),
                Metadata::new(),
            )
            .await
            .unwrap();
        let (_, bytes) = service.serve(&session, "photos", "cat.png").await.unwrap();
        let after = store
            .head_object(&thumbs, "AUTH_test", "photos_cat.png")
            .await
            .unwrap();
        assert_ne!(before.get("x-timestamp"), after.get("x-timestamp"));
        let thumbnail = image::load_from_memory(&bytes).unwrap();
        assert_eq!((thumbnail.width(), thumbnail.height()), (32, 16));
    }

    #[tokio::test]
    async fn test_missing_source_is_upstream_error() {
        let (_store, service, session) = setup().await;
        let err = service
            .serve(&session, "photos", "absent.png")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_undecodable_source_fails_only_at_final_fetch() {
        let (store, service, session) = setup().await;
        store
            .put_object(
                &session,
                "photos",
                "notes.txt",
                b"not an image".to_vec(),
                Some("text/plain"),
                Metadata::new(),
            )
            .await
            .unwrap();

        // Regeneration is swallowed; the final fetch finds nothing to
        // serve and that is the error the caller sees.
        let err = service
            .serve(&session, "photos", "notes.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
