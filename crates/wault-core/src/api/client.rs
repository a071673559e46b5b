//! Authenticated request envelope for the resource API.
//!
//! Every authenticated request first goes through the `SessionGuard`, then
//! re-reads the credential from the store and sends it as
//! `Authorization: bearer <token>` plus a `deviceId` header. A request always
//! settles: 200 yields the parsed body, anything else is an `ApiError`.

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::ApiError;
use crate::auth::{Credential, CredentialStore, SessionGuard};
use crate::config::ClientConfig;

/// Header carrying the device identifier issued at sign-in
pub const DEVICE_ID_HEADER: &str = "deviceid";

/// Content type sent with every JSON POST
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// API client for the resource API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    store: CredentialStore,
    guard: SessionGuard,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: CredentialStore,
        guard: SessionGuard,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            store,
            guard,
        })
    }

    /// The credential currently in the store, for embedding in links.
    pub fn credential(&self) -> Option<Credential> {
        self.store.load()
    }

    /// GET that requires a session, signing in first if needed.
    pub async fn authenticated_get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        self.guard.ensure_signed_in().await?;
        let credential = self.store.load().ok_or(ApiError::NotSignedIn)?;

        let request = self
            .client
            .get(url.clone())
            .headers(Self::auth_headers(&credential)?);
        self.send(request, "GET", &url).await
    }

    /// JSON POST that requires a session, signing in first if needed.
    pub async fn authenticated_post<T, B>(&self, url: Url, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.guard.ensure_signed_in().await?;
        let credential = self.store.load().ok_or(ApiError::NotSignedIn)?;

        let payload = serde_json::to_vec(body)?;
        let request = self
            .client
            .post(url.clone())
            .headers(Self::auth_headers(&credential)?)
            .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload);
        self.send(request, "POST", &url).await
    }

    /// GET that does not require a session. Session headers are still sent
    /// when one happens to exist.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut request = self.client.get(url.clone());
        if let Some(credential) = self.store.load() {
            request = request.headers(Self::auth_headers(&credential)?);
        }
        self.send(request, "GET", &url).await
    }

    fn auth_headers(credential: &Credential) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("bearer {}", credential.access_token))?,
        );
        headers.insert(
            HeaderName::from_static(DEVICE_ID_HEADER),
            HeaderValue::from_str(&credential.device_id)?,
        );
        Ok(headers)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: &str,
        url: &Url,
    ) -> Result<T, ApiError> {
        // Query strings may carry access tokens
        let path = url.path();

        let response = request.send().await.map_err(|e| {
            warn!(method = method, path = path, error = %e, "Request failed");
            ApiError::Transport(e)
        })?;

        let status = response.status();
        debug!(method = method, path = path, status = status.as_u16(), "API response");

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(method = method, path = path, status = status.as_u16(), "API request rejected");
            return Err(ApiError::from_status(status, &body));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, path)))
    }
}
