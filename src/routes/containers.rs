//! Container routes: account listing, create/delete, public toggle, ACLs.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Session;
use crate::acl;
use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::store::{ContainerSummary, Metadata, ObjectStore};

const READ_ACL_META: &str = "x-container-read";
const WRITE_ACL_META: &str = "x-container-write";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_containers).post(create_container))
        .route("/:container", delete(delete_container))
        .route("/:container/toggle-public", post(toggle_public))
        .route(
            "/:container/acl",
            get(list_acl).post(add_acl).delete(remove_acl),
        )
}

#[derive(Serialize)]
struct AccountView {
    account: String,
    account_stat: Metadata,
    containers: Vec<ContainerSummary>,
}

async fn list_containers(
    State(state): State<AppState>,
    Session(session): Session,
) -> Result<Json<AccountView>> {
    let (account_stat, containers) = state
        .store()
        .get_account(&session)
        .await
        .map_err(|e| AppError::AccessDenied(format!("cannot list account: {e}")))?;
    Ok(Json(AccountView {
        account: session.account().to_string(),
        account_stat,
        containers,
    }))
}

#[derive(Deserialize)]
struct CreateContainerRequest {
    name: String,
}

#[derive(Serialize)]
struct StatusMessage {
    message: String,
}

async fn create_container(
    State(state): State<AppState>,
    Session(session): Session,
    Json(request): Json<CreateContainerRequest>,
) -> Result<Json<StatusMessage>> {
    state
        .store()
        .put_container(&session, &request.name)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    Ok(Json(StatusMessage {
        message: "Container created.".to_string(),
    }))
}

/// Delete a container and everything in it. The store refuses to drop a
/// non-empty container, so members go first.
async fn delete_container(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
) -> Result<Json<StatusMessage>> {
    let store = state.store();
    let (_, entries) = store
        .get_container(&session, &container, None, None)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    for entry in &entries {
        store
            .delete_object(&session, &container, entry.name())
            .await
            .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    }
    store
        .delete_container(&session, &container)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    Ok(Json(StatusMessage {
        message: "Container deleted.".to_string(),
    }))
}

#[derive(Serialize)]
struct PublicState {
    public: bool,
}

async fn toggle_public(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
) -> Result<Json<PublicState>> {
    let store = state.store();
    let metadata = store
        .head_container(&session, &container)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    let read_acl = metadata.get(READ_ACL_META).cloned().unwrap_or_default();

    let toggled = acl::toggle_public(&read_acl);
    let mut headers = Metadata::new();
    headers.insert(READ_ACL_META.to_string(), toggled.clone());
    store
        .post_container(&session, &container, headers)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;

    Ok(Json(PublicState {
        public: acl::is_public(&toggled),
    }))
}

#[derive(Serialize)]
struct AclView {
    container: String,
    acls: BTreeMap<String, acl::AclEntry>,
    public: bool,
}

async fn read_acls(
    state: &AppState,
    session: &crate::store::StorageSession,
    container: &str,
) -> Result<(String, String)> {
    let metadata = state
        .store()
        .head_container(session, container)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    Ok((
        metadata.get(READ_ACL_META).cloned().unwrap_or_default(),
        metadata.get(WRITE_ACL_META).cloned().unwrap_or_default(),
    ))
}

async fn list_acl(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
) -> Result<Json<AclView>> {
    let (readers, writers) = read_acls(&state, &session, &container).await?;
    Ok(Json(AclView {
        acls: acl::entries(&readers, &writers),
        public: acl::is_public(&readers),
        container,
    }))
}

#[derive(Deserialize)]
struct AddAclRequest {
    username: String,
    #[serde(default)]
    read: bool,
    #[serde(default)]
    write: bool,
}

async fn add_acl(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Json(request): Json<AddAclRequest>,
) -> Result<Json<StatusMessage>> {
    let (readers, writers) = read_acls(&state, &session, &container).await?;
    let mut readers = acl::remove_duplicates(&readers);
    let mut writers = acl::remove_duplicates(&writers);
    if request.read {
        readers = acl::grant(&readers, &request.username);
    }
    if request.write {
        writers = acl::grant(&writers, &request.username);
    }

    let mut headers = Metadata::new();
    headers.insert(READ_ACL_META.to_string(), readers);
    headers.insert(WRITE_ACL_META.to_string(), writers);
    state
        .store()
        .post_container(&session, &container, headers)
        .await
        .map_err(|_| AppError::AccessDenied("ACL update failed.".to_string()))?;
    Ok(Json(StatusMessage {
        message: "ACLs updated.".to_string(),
    }))
}

#[derive(Deserialize)]
struct RemoveAclQuery {
    users: String,
}

async fn remove_acl(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Query(query): Query<RemoveAclQuery>,
) -> Result<Json<StatusMessage>> {
    let users: Vec<&str> = query.users.split(',').collect();
    let (readers, writers) = read_acls(&state, &session, &container).await?;

    let mut headers = Metadata::new();
    headers.insert(READ_ACL_META.to_string(), acl::revoke(&readers, &users));
    headers.insert(WRITE_ACL_META.to_string(), acl::revoke(&writers, &users));
    state
        .store()
        .post_container(&session, &container, headers)
        .await
        .map_err(|_| AppError::AccessDenied("ACL update failed.".to_string()))?;
    Ok(Json(StatusMessage {
        message: "ACL removed.".to_string(),
    }))
}
