//! Trash manager
//!
//! Soft-delete for objects, prefixes and whole containers. Deleted items
//! are packaged as zip archives into a dedicated trash-service account —
//! one container per user account, entries named
//! `<original_container>/<original_path>` — tagged with `X-Delete-After`
//! so the store expires them on its own; nothing here sweeps.
//!
//! None of these operations is atomic across its store calls. The write
//! order is always trash-entry-first, live-delete-second: a crash in
//! between leaves both copies present, never neither.

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::alias::resolve_origin;
use crate::config::{AliasConfig, Config, TrashConfig};
use crate::error::{AppError, Result};
use crate::hierarchy::{
    materialize_prefix_chain, parent_prefix, partition_listing, DIRECTORY_MARKER,
};
use crate::store::{ListEntry, Metadata, ObjectStore, StorageSession};

const ORIGINAL_LENGTH_META: &str = "x-object-meta-original-length";
const DELETE_AFTER_HEADER: &str = "x-delete-after";

/// What a collection operation acted on, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Container,
    Folder,
}

/// One entry of a trash listing.
#[derive(Debug, Clone, Serialize)]
pub struct TrashEntry {
    pub name: String,
    /// Original (unpacked) size, from the entry's metadata.
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    pub directory: bool,
}

#[derive(Clone)]
pub struct TrashManager {
    store: Arc<dyn ObjectStore>,
    auth_url: String,
    auth_version: u8,
    config: TrashConfig,
    alias: AliasConfig,
}

impl TrashManager {
    pub fn new(store: Arc<dyn ObjectStore>, config: &Config) -> Self {
        Self {
            store,
            auth_url: config.swift.auth_url.clone(),
            auth_version: config.swift.auth_version,
            config: config.trash.clone(),
            alias: config.alias.clone(),
        }
    }

    /// Username of the trash service account, for ownership guards.
    pub fn service_username(&self) -> &str {
        &self.config.username
    }

    async fn service_session(&self) -> Result<StorageSession> {
        self.store
            .authenticate(
                &self.auth_url,
                &self.config.username,
                &self.config.auth_key,
                self.auth_version,
            )
            .await
            .map_err(|e| {
                tracing::error!("Trash service authentication failed: {}", e);
                AppError::Internal("trash service unavailable".to_string())
            })
    }

    async fn ensure_trash_container(
        &self,
        trash_session: &StorageSession,
        account: &str,
    ) -> Result<()> {
        if self
            .store
            .head_container(trash_session, account)
            .await
            .is_ok()
        {
            return Ok(());
        }
        self.store
            .put_container(trash_session, account)
            .await
            .map_err(|e| {
                tracing::error!("Cannot put container {}: {}", account, e);
                AppError::Internal(format!("cannot create trash container {account}"))
            })
    }

    fn ttl_headers(&self, original_length: u64) -> Metadata {
        let mut headers = Metadata::new();
        headers.insert(
            DELETE_AFTER_HEADER.to_string(),
            self.config.ttl_seconds.to_string(),
        );
        headers.insert(
            ORIGINAL_LENGTH_META.to_string(),
            original_length.to_string(),
        );
        headers
    }

    /// Move one object into the trash. Returns the trash entry name.
    pub async fn soft_delete_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<String> {
        let origin = resolve_origin(self.store.as_ref(), session, container, &self.alias)
            .await
            .map_err(|e| {
                AppError::Internal(format!("cannot resolve origin of {container}: {e}"))
            })?;
        let trash_session = self.service_session().await?;

        let (metadata, content) = self
            .store
            .get_object(session, container, object)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot retrieve object {} of container {}: {}",
                    object,
                    container,
                    e
                );
                AppError::Internal(format!("cannot read {container}/{object}"))
            })?;
        let original_length = metadata
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(content.len() as u64);

        self.ensure_trash_container(&trash_session, &origin.account)
            .await?;

        let archive = pack_single(object, &content)?;
        let trash_name = format!("{}/{}", origin.container, object);
        self.store
            .put_object(
                &trash_session,
                &origin.account,
                &trash_name,
                archive,
                None,
                self.ttl_headers(original_length),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot put object {} to container {}: {}",
                    trash_name,
                    origin.account,
                    e
                );
                AppError::Internal(format!("cannot write trash entry {trash_name}"))
            })?;

        if let Err(e) = self.store.delete_object(session, container, object).await {
            tracing::error!(
                "Cannot delete object {} of container {}: {}",
                object,
                container,
                e
            );
            // Undo the trash write so the item does not exist twice.
            if let Err(e) = self
                .store
                .delete_object(&trash_session, &origin.account, &trash_name)
                .await
            {
                tracing::error!("Cannot roll back trash entry {}: {}", trash_name, e);
            }
            return Err(AppError::AccessDenied(
                "could not delete the live object".to_string(),
            ));
        }

        Ok(trash_name)
    }

    /// Move everything under `prefix` (the whole container when `None`)
    /// into the trash as one archive.
    pub async fn soft_delete_collection(
        &self,
        session: &StorageSession,
        container: &str,
        prefix: Option<&str>,
    ) -> Result<CollectionKind> {
        let origin = resolve_origin(self.store.as_ref(), session, container, &self.alias)
            .await
            .map_err(|e| {
                AppError::Internal(format!("cannot resolve origin of {container}: {e}"))
            })?;
        let trash_session = self.service_session().await?;

        let (_, entries) = self
            .store
            .get_container(session, container, prefix, None)
            .await
            .map_err(|e| {
                tracing::error!("Cannot retrieve container {}: {}", container, e);
                AppError::Internal(format!("cannot list {container}"))
            })?;

        // Folder markers are deleted with everything else below but carry
        // no payload worth archiving.
        let (_, objects) = partition_listing(entries.clone(), prefix);

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut original_length: u64 = 0;
        for object in &objects {
            let (metadata, content) = self
                .store
                .get_object(session, container, &object.name)
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Cannot retrieve object {} of container {}: {}",
                        object.name,
                        container,
                        e
                    );
                    AppError::Internal(format!("cannot read {container}/{}", object.name))
                })?;
            original_length += metadata
                .get("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(content.len() as u64);
            writer
                .start_file(object.name.as_str(), SimpleFileOptions::default())
                .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?;
            writer
                .write_all(&content)
                .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?;
        }
        let archive = writer
            .finish()
            .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?
            .into_inner();

        self.ensure_trash_container(&trash_session, &origin.account)
            .await?;

        let trash_name = format!("{}/{}", origin.container, prefix.unwrap_or(""));
        self.store
            .put_object(
                &trash_session,
                &origin.account,
                &trash_name,
                archive,
                Some(DIRECTORY_MARKER),
                self.ttl_headers(original_length),
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot put object {} to container {}: {}",
                    trash_name,
                    origin.account,
                    e
                );
                AppError::Internal(format!("cannot write trash entry {trash_name}"))
            })?;

        for entry in &entries {
            if let Err(e) = self
                .store
                .delete_object(session, container, entry.name())
                .await
            {
                tracing::error!(
                    "Cannot delete all objects of container {}: {}",
                    container,
                    e
                );
                self.roll_back(&trash_session, &origin.account, &trash_name)
                    .await;
                return Err(AppError::AccessDenied(
                    "could not delete the live objects".to_string(),
                ));
            }
        }

        if prefix.is_none() {
            if let Err(e) = self.store.delete_container(session, container).await {
                tracing::error!("Cannot delete container {}: {}", container, e);
                self.roll_back(&trash_session, &origin.account, &trash_name)
                    .await;
                return Err(AppError::AccessDenied(
                    "could not delete the container".to_string(),
                ));
            }
            Ok(CollectionKind::Container)
        } else {
            Ok(CollectionKind::Folder)
        }
    }

    async fn roll_back(&self, trash_session: &StorageSession, account: &str, trash_name: &str) {
        if let Err(e) = self
            .store
            .delete_object(trash_session, account, trash_name)
            .await
        {
            tracing::error!("Cannot roll back trash entry {}: {}", trash_name, e);
        }
    }

    /// Restore a single-object trash entry to its original location.
    pub async fn restore_single(&self, session: &StorageSession, trash_name: &str) -> Result<()> {
        let account = session.account().to_string();
        let trash_session = self.service_session().await?;

        let (_, archive) = self
            .store
            .get_object(&trash_session, &account, trash_name)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot retrieve object {} of container {}: {}",
                    trash_name,
                    account,
                    e
                );
                AppError::Internal(format!("cannot read trash entry {trash_name}"))
            })?;

        let (container, object) = trash_name
            .split_once('/')
            .filter(|(c, o)| !c.is_empty() && !o.is_empty())
            .ok_or_else(|| {
                AppError::Internal(format!("trash entry {trash_name} is not a single object"))
            })?;

        let content = unpack_member(&archive, object)?;

        // On failure the trash entry stays put so the restore can be
        // retried.
        self.store
            .put_object(session, container, object, content, None, Metadata::new())
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot put object {} to container {}: {}",
                    object,
                    container,
                    e
                );
                AppError::Internal(format!("cannot restore {container}/{object}"))
            })?;

        if let Err(e) = self
            .store
            .delete_object(&trash_session, &account, trash_name)
            .await
        {
            tracing::error!(
                "Cannot delete object {} of container {}: {}",
                trash_name,
                account,
                e
            );
        }
        Ok(())
    }

    /// Restore a folder or whole-container trash entry, recreating the
    /// destination container and any pseudo-folder chain its members imply.
    pub async fn restore_collection(
        &self,
        session: &StorageSession,
        trash_name: &str,
    ) -> Result<CollectionKind> {
        let account = session.account().to_string();
        let trash_session = self.service_session().await?;

        let (_, archive) = self
            .store
            .get_object(&trash_session, &account, trash_name)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cannot retrieve object {} of container {}: {}",
                    trash_name,
                    account,
                    e
                );
                AppError::Internal(format!("cannot read trash entry {trash_name}"))
            })?;

        let container = trash_name
            .split('/')
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                AppError::Internal(format!("malformed trash entry name {trash_name}"))
            })?;

        let pre_existing = match self.store.head_container(session, container).await {
            Ok(_) => true,
            Err(_) => {
                self.store
                    .put_container(session, container)
                    .await
                    .map_err(|e| {
                        tracing::error!("Cannot put container {}: {}", container, e);
                        AppError::Internal(format!("cannot recreate container {container}"))
                    })?;
                false
            }
        };

        let mut archive = ZipArchive::new(Cursor::new(archive))
            .map_err(|e| AppError::Internal(format!("unreadable trash archive: {e}")))?;
        let names: Vec<String> = archive.file_names().map(String::from).collect();

        let mut created = HashSet::new();
        for name in &names {
            if let Some(parent) = parent_prefix(name) {
                match materialize_prefix_chain(
                    self.store.as_ref(),
                    session,
                    container,
                    &parent,
                    &created,
                )
                .await
                {
                    Ok(updated) => created = updated,
                    Err(e) => tracing::error!(
                        "Cannot create pseudofolder from prefix {} in container {}: {}",
                        parent,
                        container,
                        e
                    ),
                }
            }

            let content = {
                let mut member = archive.by_name(name).map_err(|e| {
                    AppError::Internal(format!("missing archive member {name}: {e}"))
                })?;
                let mut buffer = Vec::new();
                member.read_to_end(&mut buffer).map_err(|e| {
                    AppError::Internal(format!("unreadable archive member {name}: {e}"))
                })?;
                buffer
            };

            self.store
                .put_object(session, container, name, content, None, Metadata::new())
                .await
                .map_err(|e| {
                    tracing::error!(
                        "Cannot put object {} to container {}: {}",
                        name,
                        container,
                        e
                    );
                    AppError::Internal(format!("cannot restore {container}/{name}"))
                })?;
        }

        if let Err(e) = self
            .store
            .delete_object(&trash_session, &account, trash_name)
            .await
        {
            tracing::error!(
                "Cannot delete object {} of container {}: {}",
                trash_name,
                account,
                e
            );
        }

        Ok(if pre_existing {
            CollectionKind::Folder
        } else {
            CollectionKind::Container
        })
    }

    /// Permanently delete a trash entry. Idempotent.
    pub async fn purge(&self, session: &StorageSession, trash_name: &str) -> Result<()> {
        let account = session.account().to_string();
        let trash_session = self.service_session().await?;
        match self
            .store
            .delete_object(&trash_session, &account, trash_name)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => {
                tracing::error!(
                    "Cannot delete object {} of container {}: {}",
                    trash_name,
                    account,
                    e
                );
                Err(AppError::AccessDenied(
                    "could not delete the trash entry".to_string(),
                ))
            }
        }
    }

    /// List the session account's trash, creating its container on first
    /// use.
    pub async fn list(&self, session: &StorageSession) -> Result<Vec<TrashEntry>> {
        let account = session.account().to_string();
        let trash_session = self.service_session().await?;
        self.ensure_trash_container(&trash_session, &account).await?;

        let (_, entries) = self
            .store
            .get_container(&trash_session, &account, None, None)
            .await
            .map_err(|e| {
                tracing::error!("Cannot list trash container {}: {}", account, e);
                AppError::AccessDenied("cannot list trash".to_string())
            })?;

        let mut listing = Vec::new();
        for entry in entries {
            let ListEntry::Object(object) = entry else {
                continue;
            };
            let mut size = 0;
            let mut directory = false;
            if let Ok(metadata) = self
                .store
                .head_object(&trash_session, &account, &object.name)
                .await
            {
                size = metadata
                    .get(ORIGINAL_LENGTH_META)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                directory = metadata
                    .get("content-type")
                    .is_some_and(|ct| ct == DIRECTORY_MARKER);
            }
            listing.push(TrashEntry {
                name: object.name,
                size,
                last_modified: object.last_modified,
                directory,
            });
        }
        Ok(listing)
    }
}

/// Archive a single object, keyed by its own relative path.
fn pack_single(name: &str, content: &[u8]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(name, SimpleFileOptions::default())
        .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?;
    writer
        .write_all(content)
        .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?;
    Ok(writer
        .finish()
        .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?
        .into_inner())
}

fn unpack_member(archive: &[u8], member: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| AppError::Internal(format!("unreadable trash archive: {e}")))?;
    let mut file = archive
        .by_name(member)
        .map_err(|e| AppError::Internal(format!("missing archive member {member}: {e}")))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| AppError::Internal(format!("unreadable archive member {member}: {e}")))?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::store::{ContainerSummary, MemoryStore, StoreError};

    async fn setup() -> (Arc<MemoryStore>, TrashManager, StorageSession) {
        let store = Arc::new(MemoryStore::new());
        let config = Config::default();
        let manager = TrashManager::new(store.clone(), &config);
        let session = store
            .authenticate("memory://auth", "test:tester", "secret", 1)
            .await
            .unwrap();
        (store, manager, session)
    }

    async fn trash_session(store: &MemoryStore) -> StorageSession {
        store
            .authenticate("memory://auth", "sw_trash:sw_trash", "sw_trash", 1)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_object_round_trip() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "container").await.unwrap();
        store
            .put_object(
                &session,
                "container",
                "foo.txt",
                b"hello".to_vec(),
                Some("text/plain"),
                Metadata::new(),
            )
            .await
            .unwrap();

        let trash_name = manager
            .soft_delete_object(&session, "container", "foo.txt")
            .await
            .unwrap();
        assert_eq!(trash_name, "container/foo.txt");

        // Live object gone, trash entry present with original length and TTL.
        assert!(store
            .head_object(&session, "container", "foo.txt")
            .await
            .unwrap_err()
            .is_not_found());
        let trash = trash_session(&store).await;
        let meta = store
            .head_object(&trash, "AUTH_test", "container/foo.txt")
            .await
            .unwrap();
        assert_eq!(meta.get("x-object-meta-original-length").unwrap(), "5");
        assert_eq!(meta.get("x-delete-after").unwrap(), "3600");

        manager
            .restore_single(&session, "container/foo.txt")
            .await
            .unwrap();
        let (_, content) = store
            .get_object(&session, "container", "foo.txt")
            .await
            .unwrap();
        assert_eq!(content, b"hello");
        assert!(store
            .head_object(&trash, "AUTH_test", "container/foo.txt")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_prefix_collection_round_trip_materializes_folders() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "container").await.unwrap();
        for (name, content) in [("a/b/x", b"xx".as_slice()), ("a/b/y", b"yy".as_slice())] {
            store
                .put_object(
                    &session,
                    "container",
                    name,
                    content.to_vec(),
                    None,
                    Metadata::new(),
                )
                .await
                .unwrap();
        }

        let kind = manager
            .soft_delete_collection(&session, "container", Some("a/b/"))
            .await
            .unwrap();
        assert_eq!(kind, CollectionKind::Folder);

        // The container itself survives a sub-prefix delete.
        assert!(store.head_container(&session, "container").await.is_ok());
        assert!(store
            .head_object(&session, "container", "a/b/x")
            .await
            .unwrap_err()
            .is_not_found());
        let trash = trash_session(&store).await;
        let meta = store
            .head_object(&trash, "AUTH_test", "container/a/b/")
            .await
            .unwrap();
        assert_eq!(meta.get("x-object-meta-original-length").unwrap(), "4");
        assert_eq!(meta.get("content-type").unwrap(), DIRECTORY_MARKER);

        let kind = manager
            .restore_collection(&session, "container/a/b/")
            .await
            .unwrap();
        assert_eq!(kind, CollectionKind::Folder);

        for (name, content) in [("a/b/x", b"xx".as_slice()), ("a/b/y", b"yy".as_slice())] {
            let (_, restored) = store.get_object(&session, "container", name).await.unwrap();
            assert_eq!(restored, content);
        }
        // Missing ancestor markers were recreated, shallowest first.
        for marker in ["a/", "a/b/"] {
            let meta = store
                .head_object(&session, "container", marker)
                .await
                .unwrap();
            assert_eq!(meta.get("content-type").unwrap(), DIRECTORY_MARKER);
        }
    }

    #[tokio::test]
    async fn test_container_collection_round_trip() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "bucket").await.unwrap();
        for name in ["p", "q"] {
            store
                .put_object(
                    &session,
                    "bucket",
                    name,
                    name.as_bytes().to_vec(),
                    None,
                    Metadata::new(),
                )
                .await
                .unwrap();
        }

        let kind = manager
            .soft_delete_collection(&session, "bucket", None)
            .await
            .unwrap();
        assert_eq!(kind, CollectionKind::Container);
        assert!(store
            .head_container(&session, "bucket")
            .await
            .unwrap_err()
            .is_not_found());

        let kind = manager
            .restore_collection(&session, "bucket/")
            .await
            .unwrap();
        assert_eq!(kind, CollectionKind::Container);
        for name in ["p", "q"] {
            let (_, content) = store.get_object(&session, "bucket", name).await.unwrap();
            assert_eq!(content, name.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_marker_objects_deleted_but_not_archived() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "container").await.unwrap();
        store
            .put_object(
                &session,
                "container",
                "a/",
                Vec::new(),
                Some(DIRECTORY_MARKER),
                Metadata::new(),
            )
            .await
            .unwrap();
        store
            .put_object(
                &session,
                "container",
                "a/doc",
                b"d".to_vec(),
                None,
                Metadata::new(),
            )
            .await
            .unwrap();

        manager
            .soft_delete_collection(&session, "container", Some("a/"))
            .await
            .unwrap();
        assert!(store
            .head_object(&session, "container", "a/")
            .await
            .unwrap_err()
            .is_not_found());

        let trash = trash_session(&store).await;
        let (_, archive) = store
            .get_object(&trash, "AUTH_test", "container/a/")
            .await
            .unwrap();
        let archive = ZipArchive::new(Cursor::new(archive)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert_eq!(names, vec!["a/doc"]);
    }

    #[tokio::test]
    async fn test_purge_is_idempotent() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "container").await.unwrap();
        store
            .put_object(
                &session,
                "container",
                "junk",
                b"x".to_vec(),
                None,
                Metadata::new(),
            )
            .await
            .unwrap();
        manager
            .soft_delete_object(&session, "container", "junk")
            .await
            .unwrap();

        manager.purge(&session, "container/junk").await.unwrap();
        manager.purge(&session, "container/junk").await.unwrap();
    }

    #[tokio::test]
    async fn test_restore_single_rejects_collection_entries() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "bucket").await.unwrap();
        store
            .put_object(&session, "bucket", "p", b"p".to_vec(), None, Metadata::new())
            .await
            .unwrap();
        manager
            .soft_delete_collection(&session, "bucket", None)
            .await
            .unwrap();

        let err = manager.restore_single(&session, "bucket/").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_listing_reports_sizes_and_directories() {
        let (store, manager, session) = setup().await;
        store.put_container(&session, "container").await.unwrap();
        store
            .put_object(
                &session,
                "container",
                "file.txt",
                b"hello".to_vec(),
                None,
                Metadata::new(),
            )
            .await
            .unwrap();
        store
            .put_object(
                &session,
                "container",
                "dir/member",
                b"abc".to_vec(),
                None,
                Metadata::new(),
            )
            .await
            .unwrap();

        manager
            .soft_delete_object(&session, "container", "file.txt")
            .await
            .unwrap();
        manager
            .soft_delete_collection(&session, "container", Some("dir/"))
            .await
            .unwrap();

        let mut listing = manager.list(&session).await.unwrap();
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].name, "container/dir/");
        assert_eq!(listing[0].size, 3);
        assert!(listing[0].directory);
        assert_eq!(listing[1].name, "container/file.txt");
        assert_eq!(listing[1].size, 5);
        assert!(!listing[1].directory);
    }

    #[tokio::test]
    async fn test_listing_creates_trash_container_on_first_use() {
        let (store, manager, session) = setup().await;
        let listing = manager.list(&session).await.unwrap();
        assert!(listing.is_empty());
        let trash = trash_session(&store).await;
        assert!(store.head_container(&trash, "AUTH_test").await.is_ok());
    }

    /// Store wrapper that refuses to delete one specific live object.
    struct DenyDelete {
        inner: Arc<MemoryStore>,
        deny_object: String,
    }

    #[async_trait]
    impl ObjectStore for DenyDelete {
        async fn authenticate(
            &self,
            auth_url: &str,
            username: &str,
            password: &str,
            auth_version: u8,
        ) -> std::result::Result<StorageSession, StoreError> {
            self.inner
                .authenticate(auth_url, username, password, auth_version)
                .await
        }

        async fn get_account(
            &self,
            session: &StorageSession,
        ) -> std::result::Result<(Metadata, Vec<ContainerSummary>), StoreError> {
            self.inner.get_account(session).await
        }

        async fn post_account(
            &self,
            session: &StorageSession,
            headers: Metadata,
        ) -> std::result::Result<(), StoreError> {
            self.inner.post_account(session, headers).await
        }

        async fn get_container(
            &self,
            session: &StorageSession,
            container: &str,
            prefix: Option<&str>,
            delimiter: Option<&str>,
        ) -> std::result::Result<(Metadata, Vec<ListEntry>), StoreError> {
            self.inner
                .get_container(session, container, prefix, delimiter)
                .await
        }

        async fn put_container(
            &self,
            session: &StorageSession,
            container: &str,
        ) -> std::result::Result<(), StoreError> {
            self.inner.put_container(session, container).await
        }

        async fn post_container(
            &self,
            session: &StorageSession,
            container: &str,
            headers: Metadata,
        ) -> std::result::Result<(), StoreError> {
            self.inner.post_container(session, container, headers).await
        }

        async fn head_container(
            &self,
            session: &StorageSession,
            container: &str,
        ) -> std::result::Result<Metadata, StoreError> {
            self.inner.head_container(session, container).await
        }

        async fn delete_container(
            &self,
            session: &StorageSession,
            container: &str,
        ) -> std::result::Result<(), StoreError> {
            self.inner.delete_container(session, container).await
        }

        async fn get_object(
            &self,
            session: &StorageSession,
            container: &str,
            object: &str,
        ) -> std::result::Result<(Metadata, Vec<u8>), StoreError> {
            self.inner.get_object(session, container, object).await
        }

        async fn put_object(
            &self,
            session: &StorageSession,
            container: &str,
            object: &str,
            content: Vec<u8>,
            content_type: Option<&str>,
            headers: Metadata,
        ) -> std::result::Result<(), StoreError> {
            self.inner
                .put_object(session, container, object, content, content_type, headers)
                .await
        }

        async fn head_object(
            &self,
            session: &StorageSession,
            container: &str,
            object: &str,
        ) -> std::result::Result<Metadata, StoreError> {
            self.inner.head_object(session, container, object).await
        }

        async fn delete_object(
            &self,
            session: &StorageSession,
            container: &str,
            object: &str,
        ) -> std::result::Result<(), StoreError> {
            if object == self.deny_object {
                return Err(StoreError::AccessDenied);
            }
            self.inner.delete_object(session, container, object).await
        }
    }

    #[tokio::test]
    async fn test_failed_live_delete_rolls_back_trash_entry() {
        let inner = Arc::new(MemoryStore::new());
        let store = Arc::new(DenyDelete {
            inner: inner.clone(),
            deny_object: "stuck.txt".to_string(),
        });
        let config = Config::default();
        let manager = TrashManager::new(store.clone(), &config);
        let session = store
            .authenticate("memory://auth", "test:tester", "secret", 1)
            .await
            .unwrap();
        inner.put_container(&session, "container").await.unwrap();
        inner
            .put_object(
                &session,
                "container",
                "stuck.txt",
                b"data".to_vec(),
                None,
                Metadata::new(),
            )
            .await
            .unwrap();

        let err = manager
            .soft_delete_object(&session, "container", "stuck.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AccessDenied(_)));

        // The live object survived and the half-written trash entry is gone.
        assert!(inner
            .head_object(&session, "container", "stuck.txt")
            .await
            .is_ok());
        let trash = trash_session(&inner).await;
        assert!(inner
            .head_object(&trash, "AUTH_test", "container/stuck.txt")
            .await
            .unwrap_err()
            .is_not_found());
    }
}
