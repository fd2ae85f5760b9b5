//! In-process object store
//!
//! A complete [`ObjectStore`] implementation held in memory, used by the
//! test suites and handy for local development without a Swift deployment.
//!
//! Semantics follow the real store where the core depends on them:
//! prefix/delimiter listings, metadata head/post with empty-value removal,
//! 404s for missing resources, and refusal to delete a non-empty container.
//! `x-delete-after` is stored but not enforced; expiry is the real
//! backend's job. Write timestamps come from a monotonic counter so that
//! back-to-back writes are strictly ordered, which the thumbnail staleness
//! comparison relies on.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use tokio::sync::RwLock;

use super::error::StoreError;
use super::traits::ObjectStore;
use super::types::{ContainerSummary, ListEntry, Metadata, ObjectEntry, StorageSession};

const TIMESTAMP_BASE: f64 = 1_700_000_000.0;

#[derive(Default)]
struct StoredObject {
    content: Vec<u8>,
    content_type: String,
    metadata: Metadata,
    timestamp: f64,
}

#[derive(Default)]
struct ContainerState {
    metadata: Metadata,
    objects: BTreeMap<String, StoredObject>,
}

#[derive(Default)]
struct AccountState {
    metadata: Metadata,
    containers: BTreeMap<String, ContainerState>,
}

/// In-memory store keyed by account id.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, AccountState>>,
    clock: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_timestamp(&self) -> f64 {
        TIMESTAMP_BASE + self.clock.fetch_add(1, Ordering::SeqCst) as f64
    }

    fn account_id(session: &StorageSession) -> Result<String, StoreError> {
        let account = session.account();
        if account.is_empty() {
            return Err(StoreError::InvalidResponse(
                "storage url has no account segment".to_string(),
            ));
        }
        Ok(account.to_string())
    }
}

fn last_modified(timestamp: f64) -> String {
    DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string())
        .unwrap_or_default()
}

/// Apply a metadata post: empty values remove the key.
fn merge_metadata(target: &mut Metadata, headers: Metadata) {
    for (name, value) in headers {
        let name = name.to_lowercase();
        if value.is_empty() {
            target.remove(&name);
        } else {
            target.insert(name, value);
        }
    }
}

fn object_metadata(name: &str, object: &StoredObject) -> Metadata {
    let mut metadata = object.metadata.clone();
    metadata.insert("content-type".to_string(), object.content_type.clone());
    metadata.insert(
        "content-length".to_string(),
        object.content.len().to_string(),
    );
    metadata.insert("x-timestamp".to_string(), format!("{:.5}", object.timestamp));
    metadata.insert(
        "last-modified".to_string(),
        last_modified(object.timestamp),
    );
    metadata.insert("x-object-name".to_string(), name.to_string());
    metadata
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn authenticate(
        &self,
        _auth_url: &str,
        username: &str,
        password: &str,
        _auth_version: u8,
    ) -> Result<StorageSession, StoreError> {
        if password.is_empty() {
            return Err(StoreError::AuthRejected);
        }
        let tenant = username.split(':').next().unwrap_or(username);
        let account = format!("AUTH_{tenant}");

        let mut accounts = self.accounts.write().await;
        accounts.entry(account.clone()).or_default();

        Ok(StorageSession {
            storage_url: format!("memory://store/v1/{account}"),
            auth_token: format!("tkn_{tenant}"),
            username: username.to_string(),
        })
    }

    async fn get_account(
        &self,
        session: &StorageSession,
    ) -> Result<(Metadata, Vec<ContainerSummary>), StoreError> {
        let account = Self::account_id(session)?;
        let accounts = self.accounts.read().await;
        let state = accounts.get(&account).ok_or(StoreError::NotFound)?;
        let containers = state
            .containers
            .iter()
            .map(|(name, container)| ContainerSummary {
                name: name.clone(),
                count: container.objects.len() as u64,
                bytes: container
                    .objects
                    .values()
                    .map(|o| o.content.len() as u64)
                    .sum(),
            })
            .collect();
        Ok((state.metadata.clone(), containers))
    }

    async fn post_account(
        &self,
        session: &StorageSession,
        headers: Metadata,
    ) -> Result<(), StoreError> {
        let account = Self::account_id(session)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts.get_mut(&account).ok_or(StoreError::NotFound)?;
        merge_metadata(&mut state.metadata, headers);
        Ok(())
    }

    async fn get_container(
        &self,
        session: &StorageSession,
        container: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<(Metadata, Vec<ListEntry>), StoreError> {
        let account = Self::account_id(session)?;
        let accounts = self.accounts.read().await;
        let state = accounts
            .get(&account)
            .and_then(|a| a.containers.get(container))
            .ok_or(StoreError::NotFound)?;

        let prefix = prefix.unwrap_or("");
        let mut entries = Vec::new();
        let mut seen_subdirs = Vec::new();
        for (name, object) in &state.objects {
            let Some(rest) = name.strip_prefix(prefix) else {
                continue;
            };
            if let Some(delimiter) = delimiter {
                if let Some(index) = rest.find(delimiter) {
                    let subdir = format!("{prefix}{}", &rest[..index + delimiter.len()]);
                    // Exception: a marker object named exactly like the
                    // common prefix still lists as itself below.
                    if subdir != *name {
                        if !seen_subdirs.contains(&subdir) {
                            seen_subdirs.push(subdir.clone());
                            entries.push(ListEntry::Subdir { subdir });
                        }
                        continue;
                    }
                }
            }
            entries.push(ListEntry::Object(ObjectEntry {
                name: name.clone(),
                bytes: object.content.len() as u64,
                last_modified: Some(last_modified(object.timestamp)),
                content_type: Some(object.content_type.clone()),
                hash: None,
            }));
        }
        Ok((state.metadata.clone(), entries))
    }

    async fn put_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<(), StoreError> {
        let account = Self::account_id(session)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts.get_mut(&account).ok_or(StoreError::NotFound)?;
        state.containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn post_container(
        &self,
        session: &StorageSession,
        container: &str,
        headers: Metadata,
    ) -> Result<(), StoreError> {
        let account = Self::account_id(session)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(&account)
            .and_then(|a| a.containers.get_mut(container))
            .ok_or(StoreError::NotFound)?;
        merge_metadata(&mut state.metadata, headers);
        Ok(())
    }

    async fn head_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<Metadata, StoreError> {
        let account = Self::account_id(session)?;
        let accounts = self.accounts.read().await;
        let state = accounts
            .get(&account)
            .and_then(|a| a.containers.get(container))
            .ok_or(StoreError::NotFound)?;
        let mut metadata = state.metadata.clone();
        metadata.insert(
            "x-container-object-count".to_string(),
            state.objects.len().to_string(),
        );
        Ok(metadata)
    }

    async fn delete_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<(), StoreError> {
        let account = Self::account_id(session)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts.get_mut(&account).ok_or(StoreError::NotFound)?;
        let existing = state.containers.get(container).ok_or(StoreError::NotFound)?;
        if !existing.objects.is_empty() {
            return Err(StoreError::UnexpectedStatus(409));
        }
        state.containers.remove(container);
        Ok(())
    }

    async fn get_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(Metadata, Vec<u8>), StoreError> {
        let account = Self::account_id(session)?;
        let accounts = self.accounts.read().await;
        let stored = accounts
            .get(&account)
            .and_then(|a| a.containers.get(container))
            .and_then(|c| c.objects.get(object))
            .ok_or(StoreError::NotFound)?;
        Ok((object_metadata(object, stored), stored.content.clone()))
    }

    async fn put_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
        headers: Metadata,
    ) -> Result<(), StoreError> {
        let account = Self::account_id(session)?;
        let timestamp = self.next_timestamp();
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(&account)
            .and_then(|a| a.containers.get_mut(container))
            .ok_or(StoreError::NotFound)?;
        let mut metadata = Metadata::new();
        merge_metadata(&mut metadata, headers);
        state.objects.insert(
            object.to_string(),
            StoredObject {
                content,
                content_type: content_type
                    .unwrap_or("application/octet-stream")
                    .to_string(),
                metadata,
                timestamp,
            },
        );
        Ok(())
    }

    async fn head_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<Metadata, StoreError> {
        let account = Self::account_id(session)?;
        let accounts = self.accounts.read().await;
        let stored = accounts
            .get(&account)
            .and_then(|a| a.containers.get(container))
            .and_then(|c| c.objects.get(object))
            .ok_or(StoreError::NotFound)?;
        Ok(object_metadata(object, stored))
    }

    async fn delete_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(), StoreError> {
        let account = Self::account_id(session)?;
        let mut accounts = self.accounts.write().await;
        let state = accounts
            .get_mut(&account)
            .and_then(|a| a.containers.get_mut(container))
            .ok_or(StoreError::NotFound)?;
        state
            .objects
            .remove(object)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
