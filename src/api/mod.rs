//! Thin wrappers over the backend REST API.
//!
//! Reads that only feed the UI (profiles, search, follow listings) are
//! best-effort: failures are logged and an empty value comes back.
//! User-initiated mutations return [`ApiResult`] so callers can roll back
//! and show the normalized message.

mod auth;
mod communities;
mod follow;
mod posts;
mod users;

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::events::ProfileEvents;
use crate::storage::PersistenceBridge;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Arc<RwLock<Option<String>>>,
    bridge: Option<PersistenceBridge>,
    events: ProfileEvents,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Validation(format!("Invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Validation(format!(
                "Invalid API base URL: {}",
                config.base_url
            )));
        }

        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            token: Arc::new(RwLock::new(None)),
            bridge: None,
            events: ProfileEvents::new(),
        })
    }

    /// Cache fetched profiles under the per-user storage keys.
    pub fn with_persistence(mut self, bridge: PersistenceBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn with_events(mut self, events: ProfileEvents) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &ProfileEvents {
        &self.events
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    pub fn clear_token(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }

    /// Base URL plus percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation("API base URL cannot take a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_response(response).await)
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    async fn post<B, T>(&self, url: Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Default,
    {
        let response = self.send(self.http.post(url).json(body)).await?;
        decode_or_default(response).await
    }

    /// POST whose response body must be present.
    async fn create<B, T>(&self, url: Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.http.post(url).json(body)).await?;
        decode(response).await
    }

    async fn put<B, T>(&self, url: Url, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(self.http.put(url).json(body)).await?;
        decode(response).await
    }

    async fn delete<T: DeserializeOwned + Default>(&self, url: Url) -> ApiResult<T> {
        let response = self.send(self.http.delete(url)).await?;
        decode_or_default(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Like [`decode`], but an empty body yields `T::default()`.
async fn decode_or_default<T: DeserializeOwned + Default>(response: Response) -> ApiResult<T> {
    let body = response.bytes().await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    Ok(serde_json::from_slice(&body)?)
}
