//! Trash routes
//!
//! Soft-delete endpoints hang off the container paths; listing, restore
//! and purge live under `/api/trash/:account`. Users only ever see the
//! trash of their own account, and the trash service account itself may
//! not trash things.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Session;
use crate::error::{AppError, Result};
use crate::hierarchy::parent_prefix;
use crate::state::AppState;
use crate::store::StorageSession;
use crate::trash::{CollectionKind, TrashEntry};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:account", get(list_trash))
        .route("/:account/entry/*name", delete(purge_entry))
        .route("/:account/restore/*name", post(restore_single))
        .route("/:account/restore-collection/*name", post(restore_collection))
}

/// Soft-delete routes merged into the `/api/containers` nest.
pub fn containers_router() -> Router<AppState> {
    Router::new()
        .route("/:container/trash", delete(trash_collection))
        .route("/:container/trash/*name", delete(trash_object))
}

/// Trash views and mutations act on the container named for the session's
/// own account; anything else is somebody else's trash.
fn require_own_account(session: &StorageSession, account: &str) -> Result<()> {
    if session.storage_url.is_empty() || session.account() != account {
        return Err(AppError::AccessDenied("Access denied.".to_string()));
    }
    Ok(())
}

fn forbid_service_user(session: &StorageSession, service_username: &str) -> Result<()> {
    if session.username == service_username {
        return Err(AppError::AccessDenied(
            "service accounts have no trash".to_string(),
        ));
    }
    Ok(())
}

#[derive(Serialize)]
struct TrashListing {
    account: String,
    objects: Vec<TrashEntry>,
}

async fn list_trash(
    State(state): State<AppState>,
    Session(session): Session,
    Path(account): Path<String>,
) -> Result<Json<TrashListing>> {
    require_own_account(&session, &account)?;
    let objects = state.trash().list(&session).await?;
    Ok(Json(TrashListing { account, objects }))
}

#[derive(Serialize)]
struct TrashStatus {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_prefix: Option<String>,
}

async fn purge_entry(
    State(state): State<AppState>,
    Session(session): Session,
    Path((account, name)): Path<(String, String)>,
) -> Result<Json<TrashStatus>> {
    require_own_account(&session, &account)?;
    state.trash().purge(&session, &name).await?;
    Ok(Json(TrashStatus {
        message: "Object deleted.".to_string(),
        parent_prefix: None,
    }))
}

async fn restore_single(
    State(state): State<AppState>,
    Session(session): Session,
    Path((account, name)): Path<(String, String)>,
) -> Result<Json<TrashStatus>> {
    require_own_account(&session, &account)?;
    state.trash().restore_single(&session, &name).await?;
    Ok(Json(TrashStatus {
        message: "Object restored.".to_string(),
        parent_prefix: None,
    }))
}

async fn restore_collection(
    State(state): State<AppState>,
    Session(session): Session,
    Path((account, name)): Path<(String, String)>,
) -> Result<Json<TrashStatus>> {
    require_own_account(&session, &account)?;
    let kind = state.trash().restore_collection(&session, &name).await?;
    let message = match kind {
        CollectionKind::Container => "Container restored.",
        CollectionKind::Folder => "Folder restored.",
    };
    Ok(Json(TrashStatus {
        message: message.to_string(),
        parent_prefix: None,
    }))
}

async fn trash_object(
    State(state): State<AppState>,
    Session(session): Session,
    Path((container, name)): Path<(String, String)>,
) -> Result<Json<TrashStatus>> {
    forbid_service_user(&session, state.trash().service_username())?;
    let trash_name = state
        .trash()
        .soft_delete_object(&session, &container, &name)
        .await?;
    Ok(Json(TrashStatus {
        message: format!("{trash_name} moved to trash."),
        parent_prefix: parent_prefix(&name),
    }))
}

#[derive(Deserialize)]
struct TrashCollectionQuery {
    prefix: Option<String>,
}

async fn trash_collection(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Query(query): Query<TrashCollectionQuery>,
) -> Result<Json<TrashStatus>> {
    forbid_service_user(&session, state.trash().service_username())?;
    let kind = state
        .trash()
        .soft_delete_collection(&session, &container, query.prefix.as_deref())
        .await?;
    let (message, parent) = match kind {
        CollectionKind::Container => ("Container moved to trash.", None),
        CollectionKind::Folder => (
            "Folder moved to trash.",
            query.prefix.as_deref().and_then(parent_prefix),
        ),
    };
    Ok(Json(TrashStatus {
        message: message.to_string(),
        parent_prefix: parent,
    }))
}
