//! The object-store client adapter contract.
//!
//! Every core component talks to the store through this trait and receives
//! the implementation by injection, so tests can substitute the in-process
//! [`MemoryStore`](super::MemoryStore) for the real HTTP client.

use async_trait::async_trait;

use super::error::StoreError;
use super::types::{ContainerSummary, ListEntry, Metadata, StorageSession};

/// Account/container/object CRUD plus metadata head/post against a
/// Swift-compatible store.
///
/// Object names are flat keys; slashes inside them are namespace
/// convention, not structure. All metadata maps use lowercase keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Exchange credentials for a storage endpoint and token.
    async fn authenticate(
        &self,
        auth_url: &str,
        username: &str,
        password: &str,
        auth_version: u8,
    ) -> Result<StorageSession, StoreError>;

    /// Account metadata and the list of containers.
    async fn get_account(
        &self,
        session: &StorageSession,
    ) -> Result<(Metadata, Vec<ContainerSummary>), StoreError>;

    /// Update account metadata. An empty value removes the key.
    async fn post_account(
        &self,
        session: &StorageSession,
        headers: Metadata,
    ) -> Result<(), StoreError>;

    /// Container metadata and a listing, optionally filtered by `prefix`
    /// and grouped by `delimiter`.
    async fn get_container(
        &self,
        session: &StorageSession,
        container: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<(Metadata, Vec<ListEntry>), StoreError>;

    async fn put_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<(), StoreError>;

    /// Update container metadata. An empty value removes the key.
    async fn post_container(
        &self,
        session: &StorageSession,
        container: &str,
        headers: Metadata,
    ) -> Result<(), StoreError>;

    async fn head_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<Metadata, StoreError>;

    /// Delete a container. The store rejects this while the container
    /// still holds objects.
    async fn delete_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<(), StoreError>;

    async fn get_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(Metadata, Vec<u8>), StoreError>;

    async fn put_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
        content: Vec<u8>,
        content_type: Option<&str>,
        headers: Metadata,
    ) -> Result<(), StoreError>;

    async fn head_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<Metadata, StoreError>;

    async fn delete_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(), StoreError>;
}
