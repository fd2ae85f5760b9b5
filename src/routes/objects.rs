//! Object routes: listings, pseudofolders, deletes, downloads, signed
//! URLs, upload-form parameters.

use std::io::{Cursor, Write};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Redirect, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::Session;
use crate::acl;
use crate::error::{AppError, Result};
use crate::hierarchy::{
    parent_prefix, partition_listing, prefix_list, PrefixSegment, PseudoFolder,
    DIRECTORY_CONTENT_TYPES, DIRECTORY_MARKER,
};
use crate::state::AppState;
use crate::store::{Metadata, ObjectEntry, ObjectStore, StorageSession};
use crate::tempurl::{UploadFormParams, DOWNLOAD_TTL_SECONDS, SHARE_TTL_SECONDS};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:container/objects", get(list_objects))
        .route("/:container/objects/*name", delete(delete_object))
        .route("/:container/pseudofolder", post(create_pseudofolder))
        .route("/:container/download/*name", get(download))
        .route("/:container/tempurl/*name", get(share_url))
        .route("/:container/zip", get(download_collection))
        .route("/:container/upload-params", get(upload_params))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/:account/:container", get(public_list_objects))
}

#[derive(Deserialize)]
struct ListQuery {
    prefix: Option<String>,
}

#[derive(Serialize)]
struct ObjectListing {
    container: String,
    account: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    prefixes: Vec<PrefixSegment>,
    folders: Vec<PseudoFolder>,
    objects: Vec<ObjectEntry>,
    public: bool,
}

async fn build_listing(
    state: &AppState,
    session: &StorageSession,
    container: String,
    prefix: Option<String>,
) -> Result<ObjectListing> {
    let (metadata, entries) = state
        .store()
        .get_container(session, &container, prefix.as_deref(), Some("/"))
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;

    let (folders, objects) = partition_listing(entries, prefix.as_deref());
    let read_acl = metadata
        .get("x-container-read")
        .cloned()
        .unwrap_or_default();

    Ok(ObjectListing {
        account: session.account().to_string(),
        prefixes: prefix_list(prefix.as_deref()),
        folders,
        objects,
        public: acl::is_public(&read_acl),
        container,
        prefix,
    })
}

async fn list_objects(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ObjectListing>> {
    let listing = build_listing(&state, &session, container, query.prefix).await?;
    Ok(Json(listing))
}

/// Anonymous listing of a public container, through the shared storage
/// root instead of a personal endpoint.
async fn public_list_objects(
    State(state): State<AppState>,
    Path((account, container)): Path<(String, String)>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ObjectListing>> {
    let session = StorageSession {
        storage_url: format!("{}{}", state.config().swift.public_storage_root, account),
        auth_token: " ".to_string(),
        username: String::new(),
    };
    let listing = build_listing(&state, &session, container, query.prefix).await?;
    Ok(Json(listing))
}

#[derive(Deserialize)]
struct PseudoFolderRequest {
    foldername: String,
    prefix: Option<String>,
}

#[derive(Serialize)]
struct ObjectStatus {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_prefix: Option<String>,
}

async fn create_pseudofolder(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Json(request): Json<PseudoFolderRequest>,
) -> Result<Json<ObjectStatus>> {
    let mut foldername = request.prefix.clone().unwrap_or_default();
    foldername.push_str(&request.foldername);
    // Normalize to exactly one trailing slash, dropping empty segments.
    let foldername = format!(
        "{}/",
        foldername
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    );

    state
        .store()
        .put_object(
            &session,
            &container,
            &foldername,
            Vec::new(),
            Some(DIRECTORY_MARKER),
            Metadata::new(),
        )
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;

    Ok(Json(ObjectStatus {
        message: "Pseudofolder created.".to_string(),
        parent_prefix: request.prefix,
    }))
}

/// Delete one object; a folder marker deletes its whole subtree.
async fn delete_object(
    State(state): State<AppState>,
    Session(session): Session,
    Path((container, name)): Path<(String, String)>,
) -> Result<Json<ObjectStatus>> {
    let store = state.store();
    let metadata = store
        .head_object(&session, &container, &name)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;

    let is_folder = metadata
        .get("content-type")
        .is_some_and(|ct| DIRECTORY_CONTENT_TYPES.contains(&ct.as_str()));

    let message = if is_folder {
        let (_, entries) = store
            .get_container(&session, &container, Some(&name), None)
            .await
            .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
        for entry in &entries {
            store
                .delete_object(&session, &container, entry.name())
                .await
                .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
        }
        "Folder deleted."
    } else {
        store
            .delete_object(&session, &container, &name)
            .await
            .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
        "Object deleted."
    };

    Ok(Json(ObjectStatus {
        message: message.to_string(),
        parent_prefix: parent_prefix(&name),
    }))
}

/// Redirect to a short-lived signed URL so the store serves the bytes
/// itself.
async fn download(
    State(state): State<AppState>,
    Session(session): Session,
    Path((container, name)): Path<(String, String)>,
) -> Result<Redirect> {
    let url = state
        .tempurl()
        .download_url(&session, &container, &name, DOWNLOAD_TTL_SECONDS)
        .await
        .ok_or_else(|| AppError::AccessDenied("Access denied.".to_string()))?;
    Ok(Redirect::temporary(&url))
}

/// A week-long share link, returned as plain text.
async fn share_url(
    State(state): State<AppState>,
    Session(session): Session,
    Path((container, name)): Path<(String, String)>,
) -> Result<String> {
    state
        .tempurl()
        .download_url(&session, &container, &name, SHARE_TTL_SECONDS)
        .await
        .ok_or_else(|| AppError::AccessDenied("Access denied.".to_string()))
}

#[derive(Deserialize)]
struct CollectionQuery {
    prefix: Option<String>,
    #[serde(default)]
    non_recursive: bool,
}

/// Stream a container or pseudofolder as one zip download, member names
/// relative to the requested prefix.
async fn download_collection(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> Result<Response> {
    let store = state.store();
    let delimiter = if query.non_recursive { Some("/") } else { None };
    let (_, entries) = store
        .get_container(&session, &container, query.prefix.as_deref(), delimiter)
        .await
        .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
    let (_, objects) = partition_listing(entries, query.prefix.as_deref());

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for object in &objects {
        let (_, content) = store
            .get_object(&session, &container, &object.name)
            .await
            .map_err(|_| AppError::AccessDenied("Access denied.".to_string()))?;
        let member = match &query.prefix {
            Some(prefix) => object
                .name
                .strip_prefix(prefix.as_str())
                .unwrap_or(object.name.as_str()),
            None => object.name.as_str(),
        };
        writer
            .start_file(member, SimpleFileOptions::default())
            .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?;
        writer
            .write_all(&content)
            .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?;
    }
    let archive = writer
        .finish()
        .map_err(|e| AppError::Internal(format!("archive packing failed: {e}")))?
        .into_inner();

    let filename = match &query.prefix {
        Some(prefix) => prefix
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(container.as_str())
            .to_string(),
        None => container.clone(),
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}.zip\""),
        )
        .body(Body::from(archive))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[derive(Deserialize)]
struct UploadQuery {
    prefix: Option<String>,
    #[serde(default)]
    redirect_url: String,
}

/// FormPOST parameters for a browser upload straight to the store.
async fn upload_params(
    State(state): State<AppState>,
    Session(session): Session,
    Path(container): Path<String>,
    Query(query): Query<UploadQuery>,
) -> Result<Json<UploadFormParams>> {
    let params = state
        .tempurl()
        .upload_form_params(
            &session,
            &container,
            query.prefix.as_deref(),
            &query.redirect_url,
        )
        .await
        .ok_or_else(|| AppError::AccessDenied("Access denied.".to_string()))?;
    Ok(Json(params))
}
