//! Portal API client with credential attachment and single-retry refresh
//!
//! Every call carries `Authorization: Bearer <access>` from the client
//! credential store. A 401 triggers one refresh against the backend's refresh
//! endpoint (directly, not through the relay) and one replay of the call. The
//! refresh step is serialized per client: a call that waited on another call's
//! refresh reuses the rotated token instead of refreshing again.
//!
//! The refresh step runs on its own task. Aborting a call stops the caller
//! from waiting, but a refresh already sent to the backend still completes and
//! its rotated pair is persisted.
//!
//! Credentials are only ever sent to `base_url`. Absolute URLs on any other
//! origin are refused with [`ClientError::ForeignOrigin`].

pub mod auth;
pub mod error;
pub mod user;

use bytes::Bytes;
use error::ClientError;
use portal_core::{
    CredentialPair, CredentialStore, MemoryCredentialStore, RefreshRequest, RefreshResponse,
};
use reqwest::{
    Client, ClientBuilder, Method, StatusCode,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Request body for a client call
#[derive(Debug, Clone)]
pub enum FetchBody {
    /// Serialized as JSON
    Json(JsonValue),
    /// Sent as-is; set the content-type header yourself (e.g. multipart with boundary)
    Bytes(Bytes),
}

/// A logical client call, replayable after a refresh
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<FetchBody>,
}

impl FetchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post_json(path: impl Into<String>, body: JsonValue) -> Self {
        Self::new(Method::POST, path).body(FetchBody::Json(body))
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: FetchBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Buffered response of a client call
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize a successful body; error statuses become [`ClientError`]s
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if !self.is_success() {
            return Err(ClientError::from_status(self.status, self.text()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Portal API client
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    refresh_path: String,
    user_path: String,
    login_route: String,
    refresh_guard: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a new client with default configuration and an in-memory store
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The client credential store backing this client
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    fn url(&self, path: &str) -> Result<String, ClientError> {
        if !(path.starts_with("http://") || path.starts_with("https://")) {
            return Ok(format!("{}{}", self.base_url, path));
        }

        let same_origin = path
            .strip_prefix(self.base_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']));
        if same_origin {
            Ok(path.to_string())
        } else {
            Err(ClientError::ForeignOrigin(path.to_string()))
        }
    }

    /// Issue a call with stored credentials, refreshing and replaying once on 401.
    ///
    /// Returns whatever the replay yields, including a second 401. Fails with
    /// [`ClientError::Unauthorized`] when no refresh token is stored or the
    /// refresh is rejected; in the latter case the store is cleared first.
    #[tracing::instrument(
        name = "client.fetch",
        skip_all,
        fields(method = %request.method, path = %request.path, status = tracing::field::Empty)
    )]
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ClientError> {
        let pair = self.store.load().await?;
        let first = self.send(&request, pair.bearer()).await?;
        if first.status != StatusCode::UNAUTHORIZED {
            tracing::Span::current().record("status", first.status.as_u16());
            return Ok(first);
        }

        let current = self.refresh_detached(pair.access).await?;
        let retried = self.send(&request, current.bearer()).await?;
        tracing::Span::current().record("status", retried.status.as_u16());
        Ok(retried)
    }

    /// Like [`fetch`](Self::fetch), abandoned as soon as `cancel` fires.
    ///
    /// An aborted call reports [`ClientError::Aborted`] and is never replayed.
    /// Abort before a 401 arrives and no refresh starts; abort during a
    /// refresh and the refresh still finishes and updates the store.
    pub async fn fetch_with_cancel(
        &self,
        request: FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, ClientError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("Client call aborted by caller");
                Err(ClientError::Aborted)
            }
            result = self.fetch(request) => result,
        }
    }

    /// GET a JSON resource
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.fetch(FetchRequest::get(path)).await?.json()
    }

    /// Send a JSON body and decode the JSON response
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: JsonValue,
    ) -> Result<T, ClientError> {
        let request = FetchRequest::new(method, path).body(FetchBody::Json(body));
        self.fetch(request).await?.json()
    }

    async fn send(
        &self,
        request: &FetchRequest,
        bearer: Option<String>,
    ) -> Result<FetchResponse, ClientError> {
        let mut headers = request.headers.clone();
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        if let Some(bearer) = bearer {
            let value = HeaderValue::from_str(&bearer).map_err(|_| {
                ClientError::Configuration("stored access token is not a valid header".into())
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path)?)
            .headers(headers);
        builder = match &request.body {
            Some(FetchBody::Json(value)) => builder.body(serde_json::to_vec(value)?),
            Some(FetchBody::Bytes(bytes)) => builder.body(bytes.clone()),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }

    /// Refresh on a separate task so dropping the caller cannot cut the
    /// exchange off between the backend rotating the pair and the store saving it
    async fn refresh_detached(
        &self,
        rejected: Option<String>,
    ) -> Result<CredentialPair, ClientError> {
        let client = self.clone();
        tokio::spawn(async move { client.refresh_after_rejection(rejected.as_deref()).await })
            .await
            .map_err(|e| ClientError::RefreshTask(e.to_string()))?
    }

    /// Obtain a usable pair after the access token `rejected` drew a 401
    async fn refresh_after_rejection(
        &self,
        rejected: Option<&str>,
    ) -> Result<CredentialPair, ClientError> {
        let _guard = self.refresh_guard.lock().await;

        let current = self.store.load().await?;
        if current.access.is_some() && current.access.as_deref() != rejected {
            debug!("Credentials already rotated by a concurrent call");
            return Ok(current);
        }

        let Some(refresh) = current.refresh.clone() else {
            info!("Unauthorized with no refresh token stored");
            return Err(ClientError::Unauthorized("no refresh token".to_string()));
        };

        match self.exchange_refresh(refresh).await? {
            Some(tokens) => {
                let pair = current.rotated(tokens);
                self.store.save(&pair).await?;
                info!("Client credentials refreshed");
                Ok(pair)
            }
            None => {
                self.store.clear().await?;
                warn!("Refresh rejected; client credentials cleared");
                Err(ClientError::Unauthorized("refresh failed".to_string()))
            }
        }
    }

    /// POST the refresh token to the backend; `None` when the exchange was refused
    async fn exchange_refresh(
        &self,
        refresh: String,
    ) -> Result<Option<RefreshResponse>, ClientError> {
        let response = self
            .client
            .post(self.url(&self.refresh_path)?)
            .json(&RefreshRequest { refresh })
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("Refresh endpoint returned {}", response.status());
            return Ok(None);
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice::<RefreshResponse>(&body)
            .ok()
            .filter(RefreshResponse::is_usable))
    }

    pub(crate) async fn store_pair(&self, pair: &CredentialPair) -> Result<(), ClientError> {
        self.store.save(pair).await?;
        Ok(())
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    store: Option<Arc<dyn CredentialStore>>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    refresh_path: Option<String>,
    user_path: Option<String>,
    login_route: Option<String>,
}

impl ApiClientBuilder {
    /// Set the backend base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the credential store; defaults to an in-memory store
    pub fn store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Backend refresh endpoint, default `/auth/token/refresh/`
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Backend "who am I" endpoint, default `/accounts/user`
    pub fn user_path(mut self, path: impl Into<String>) -> Self {
        self.user_path = Some(path.into());
        self
    }

    /// Login entry point used for re-authentication redirects, default `/login`
    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = Some(route.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        client_builder = client_builder.user_agent(
            self.user_agent
                .unwrap_or_else(|| concat!("portal-client/", env!("CARGO_PKG_VERSION")).into()),
        );

        Ok(ApiClient {
            client: client_builder.build()?,
            base_url,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryCredentialStore::new())),
            refresh_path: self
                .refresh_path
                .unwrap_or_else(|| "/auth/token/refresh/".into()),
            user_path: self.user_path.unwrap_or_else(|| "/accounts/user".into()),
            login_route: self.login_route.unwrap_or_else(|| "/login".into()),
            refresh_guard: Arc::new(Mutex::new(())),
        })
    }
}
