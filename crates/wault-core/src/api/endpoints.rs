//! Resource API endpoints.
//!
//! `WaultClient` wires configuration, session store, sign-in handshake and the
//! request envelope together and exposes one method per endpoint.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use super::{ApiClient, ApiError};
use crate::auth::{
    Credential, CredentialStore, FrameHost, HandshakeError, MessageBus, SessionGuard,
    SessionStore, SignInHandshake,
};
use crate::clock::{Clock, SystemClock};
use crate::config::ClientConfig;
use crate::models::{AccessTokenRequest, EntryQuery, ShareRequest};

#[derive(Clone)]
pub struct WaultClient {
    config: ClientConfig,
    store: CredentialStore,
    guard: SessionGuard,
    api: ApiClient,
    bus: MessageBus,
}

impl WaultClient {
    pub fn new(
        config: ClientConfig,
        sessions: Arc<dyn SessionStore>,
        frames: Arc<dyn FrameHost>,
        bus: MessageBus,
    ) -> Result<Self, ApiError> {
        Self::with_clock(config, sessions, frames, bus, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: ClientConfig,
        sessions: Arc<dyn SessionStore>,
        frames: Arc<dyn FrameHost>,
        bus: MessageBus,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ApiError> {
        let store = CredentialStore::new(sessions, clock);
        let handshake = SignInHandshake::new(config.clone(), store.clone(), frames, bus.clone())?;
        let guard = SessionGuard::new(store.clone(), handshake);
        let api = ApiClient::new(&config, store.clone(), guard.clone())?;
        Ok(Self {
            config,
            store,
            guard,
            api,
            bus,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bus the host forwards frame messages into.
    pub fn message_bus(&self) -> &MessageBus {
        &self.bus
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn handshake(&self) -> &SignInHandshake {
        self.guard.handshake()
    }

    pub async fn ensure_signed_in(&self) -> Result<(), HandshakeError> {
        self.guard.ensure_signed_in().await
    }

    pub fn credential(&self) -> Option<Credential> {
        self.store.load()
    }

    pub fn sign_out(&self) -> anyhow::Result<()> {
        self.store.clear()
    }

    /// GET /api/entries/V2
    pub async fn load_entries(&self, query: &EntryQuery) -> Result<Value, ApiError> {
        let mut url = self.api_url("/api/entries/V2")?;
        url.query_pairs_mut().extend_pairs(query.query_pairs());
        self.api.authenticated_get(url).await
    }

    /// GET /api/v2/entries/claim. Needs no session; the claim's own access
    /// token authorizes the lookup.
    pub async fn load_claim(&self, access_token: &str) -> Result<Value, ApiError> {
        let mut url = self.api_url("/api/v2/entries/claim")?;
        url.query_pairs_mut().append_pair("accessToken", access_token);
        self.api.get(url).await
    }

    /// Portal link for viewing a shared document.
    pub fn document_url(&self, access_token: &str) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}/documents/view", self.config.portal_base_url))?;
        url.query_pairs_mut().append_pair("token", access_token);
        Ok(url)
    }

    /// Direct download link for a shared file.
    pub fn file_url(&self, access_token: &str) -> Result<Url, ApiError> {
        let mut url = self.api_url("/api/v2/entries/file")?;
        url.query_pairs_mut().append_pair("accessToken", access_token);
        Ok(url)
    }

    /// POST /api/v2/entries/accessRequests
    pub async fn request_access_tokens(
        &self,
        request: &AccessTokenRequest,
    ) -> Result<Value, ApiError> {
        let url = self.api_url("/api/v2/entries/accessRequests")?;
        self.api.authenticated_post(url, request).await
    }

    /// POST /api/v2/entries/share
    pub async fn share_entry(
        &self,
        id: &str,
        share_to: &str,
        allow_download: bool,
    ) -> Result<Value, ApiError> {
        let url = self.api_url("/api/v2/entries/share")?;
        let body = ShareRequest::new(id, share_to, allow_download);
        self.api.authenticated_post(url, &body).await
    }

    /// GET /api/documents/{id}/claims
    pub async fn load_document_claims(&self, document_id: &str) -> Result<Value, ApiError> {
        let url = self.api_path(&["api", "documents", document_id, "claims"])?;
        self.api.authenticated_get(url).await
    }

    /// GET /api/v2/entries/accessRequests/{trackId}
    pub async fn access_request_result(&self, track_id: &str) -> Result<Value, ApiError> {
        let url = self.api_path(&["api", "v2", "entries", "accessRequests", track_id])?;
        self.api.authenticated_get(url).await
    }

    fn api_url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{}", self.config.api_base_url, path))?)
    }

    /// API URL built from segments, each percent-encoded.
    fn api_path(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.api_base_url)?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
