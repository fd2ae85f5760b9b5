//! Swift HTTP client
//!
//! Implements the [`ObjectStore`] contract against a Swift-compatible
//! store's plain HTTP API. Listings are requested as JSON; metadata travels
//! as response headers and is normalized to lowercase keys.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};

use super::error::StoreError;
use super::traits::ObjectStore;
use super::types::{ContainerSummary, ListEntry, Metadata, StorageSession};

/// Thin wrapper around a shared `reqwest::Client`.
#[derive(Clone)]
pub struct SwiftClient {
    http: reqwest::Client,
}

impl SwiftClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn container_url(session: &StorageSession, container: &str) -> String {
        format!(
            "{}/{}",
            session.storage_url,
            urlencoding::encode(container)
        )
    }

    fn object_url(session: &StorageSession, container: &str, object: &str) -> String {
        // Slashes inside object names are path structure to the browser but
        // part of the flat key to the store; encode the segments between
        // them only.
        let encoded: Vec<String> = object
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}",
            Self::container_url(session, container),
            encoded.join("/")
        )
    }

    fn listing_query<'a>(
        prefix: Option<&'a str>,
        delimiter: Option<&'a str>,
    ) -> Vec<(&'static str, &'a str)> {
        let mut query = vec![("format", "json")];
        if let Some(prefix) = prefix {
            query.push(("prefix", prefix));
        }
        if let Some(delimiter) = delimiter {
            query.push(("delimiter", delimiter));
        }
        query
    }
}

impl Default for SwiftClient {
    fn default() -> Self {
        Self::new()
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.to_string())
}

fn status_error(status: StatusCode) -> StoreError {
    match status.as_u16() {
        401 | 403 => StoreError::AccessDenied,
        404 => StoreError::NotFound,
        other => StoreError::UnexpectedStatus(other),
    }
}

fn check(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(status_error(response.status()))
    }
}

fn header_metadata(headers: &HeaderMap) -> Metadata {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[async_trait]
impl ObjectStore for SwiftClient {
    async fn authenticate(
        &self,
        auth_url: &str,
        username: &str,
        password: &str,
        auth_version: u8,
    ) -> Result<StorageSession, StoreError> {
        if auth_version != 1 {
            return Err(StoreError::InvalidResponse(format!(
                "auth version {auth_version} is not supported"
            )));
        }

        let response = self
            .http
            .get(auth_url)
            .header("X-Auth-User", username)
            .header("X-Auth-Key", password)
            .send()
            .await
            .map_err(transport)?;

        if !response.status().is_success() {
            return Err(StoreError::AuthRejected);
        }

        let headers = header_metadata(response.headers());
        let storage_url = headers
            .get("x-storage-url")
            .cloned()
            .ok_or_else(|| StoreError::InvalidResponse("missing X-Storage-Url".to_string()))?;
        let auth_token = headers
            .get("x-auth-token")
            .cloned()
            .ok_or_else(|| StoreError::InvalidResponse("missing X-Auth-Token".to_string()))?;

        Ok(StorageSession {
            storage_url,
            auth_token,
            username: username.to_string(),
        })
    }

    async fn get_account(
        &self,
        session: &StorageSession,
    ) -> Result<(Metadata, Vec<ContainerSummary>), StoreError> {
        let response = self
            .http
            .get(&session.storage_url)
            .header("X-Auth-Token", &session.auth_token)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(transport)?;
        let response = check(response)?;
        let metadata = header_metadata(response.headers());
        let containers = response
            .json::<Vec<ContainerSummary>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok((metadata, containers))
    }

    async fn post_account(
        &self,
        session: &StorageSession,
        headers: Metadata,
    ) -> Result<(), StoreError> {
        let mut request = self
            .http
            .post(&session.storage_url)
            .header("X-Auth-Token", &session.auth_token);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        check(request.send().await.map_err(transport)?)?;
        Ok(())
    }

    async fn get_container(
        &self,
        session: &StorageSession,
        container: &str,
        prefix: Option<&str>,
        delimiter: Option<&str>,
    ) -> Result<(Metadata, Vec<ListEntry>), StoreError> {
        let response = self
            .http
            .get(Self::container_url(session, container))
            .header("X-Auth-Token", &session.auth_token)
            .query(&Self::listing_query(prefix, delimiter))
            .send()
            .await
            .map_err(transport)?;
        let response = check(response)?;
        let metadata = header_metadata(response.headers());
        let entries = response
            .json::<Vec<ListEntry>>()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        Ok((metadata, entries))
    }

    async fn put_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .put(Self::container_url(session, container))
            .header("X-Auth-Token", &session.auth_token)
            .send()
            .await
            .map_err(transport)?;
        check(response)?;
        Ok(())
    }

    async fn post_container(
        &self,
        session: &StorageSession,
        container: &str,
        headers: Metadata,
    ) -> Result<(), StoreError> {
        let mut request = self
            .http
            .post(Self::container_url(session, container))
            .header("X-Auth-Token", &session.auth_token);
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        check(request.send().await.map_err(transport)?)?;
        Ok(())
    }

    async fn head_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<Metadata, StoreError> {
        let response = self
            .http
            .head(Self::container_url(session, container))
            .header("X-Auth-Token", &session.auth_token)
            .send()
            .await
            .map_err(transport)?;
        let response = check(response)?;
        Ok(header_metadata(response.headers()))
    }

    async fn delete_container(
        &self,
        session: &StorageSession,
        container: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(Self::container_url(session, container))
            .header("X-Auth-Token", &session.auth_token)
            .send()
            .await
            .map_err(transport)?;
        check(response)?;
        Ok(())
    }

    async fn get_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(Metadata, Vec<u8>), StoreError> {
        let response = self
            .http
            .get(Self::object_url(session, container, object))
            .header("X-Auth-Token", &session.auth_token)
            .send()
            .await
            .map_err(transport)?;
        let response = check(response)?;
        let metadata = header_metadata(response.headers());
        let content = response.bytes().await.map_err(transport)?.to_vec();
        Ok((metadata, content))
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
        let mut request = self
            .http
            .put(Self::object_url(session, container, object))
            .header("X-Auth-Token", &session.auth_token)
            .body(content);
        if let Some(content_type) = content_type {
            request = request.header("Content-Type", content_type);
        }
        for (name, value) in &headers {
            request = request.header(name, value);
        }
        check(request.send().await.map_err(transport)?)?;
        Ok(())
    }

    async fn head_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<Metadata, StoreError> {
        let response = self
            .http
            .head(Self::object_url(session, container, object))
            .header("X-Auth-Token", &session.auth_token)
            .send()
            .await
            .map_err(transport)?;
        let response = check(response)?;
        Ok(header_metadata(response.headers()))
    }

    async fn delete_object(
        &self,
        session: &StorageSession,
        container: &str,
        object: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(Self::object_url(session, container, object))
            .header("X-Auth-Token", &session.auth_token)
            .send()
            .await
            .map_err(transport)?;
        check(response)?;
        Ok(())
    }
}
