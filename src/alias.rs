//! Alias/account resolution
//!
//! Derived caches (thumbnails, trash) are keyed by the canonical location
//! of a container's objects. An alias container carries a `storage-path`
//! metadata entry recording `<account>/<container>` of the canonical
//! location; containers without it are canonical themselves.

use crate::config::AliasConfig;
use crate::store::{ObjectStore, StorageSession, StoreError};

const STORAGE_PATH_META: &str = "x-container-meta-storage-path";

/// Canonical home of a container's objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub account: String,
    pub container: String,
}

/// Resolve the canonical `(account, container)` behind `container`.
///
/// A head failure propagates; callers must treat it as "cannot proceed",
/// never as "use defaults" — falling back here would write derived state
/// into the wrong account.
pub async fn resolve_origin(
    store: &dyn ObjectStore,
    session: &StorageSession,
    container: &str,
    convention: &AliasConfig,
) -> Result<Origin, StoreError> {
    let metadata = store
        .head_container(session, container)
        .await
        .map_err(|e| {
            tracing::error!("Cannot head container {}: {}", container, e);
            e
        })?;

    let Some(storage_path) = metadata.get(STORAGE_PATH_META) else {
        return Ok(Origin {
            account: session.account().to_string(),
            container: container.to_string(),
        });
    };

    // Recorded as `/v1/<account>/...`; the account is the second segment.
    let account = storage_path
        .split('/')
        .nth(2)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| {
            StoreError::InvalidResponse(format!(
                "malformed storage-path metadata on {container}: {storage_path}"
            ))
        })?;

    let canonical: Vec<&str> = container
        .split('_')
        .skip(convention.strip_segments)
        .collect();

    Ok(Origin {
        account: account.to_string(),
        container: canonical.join("_"),
    })
}
