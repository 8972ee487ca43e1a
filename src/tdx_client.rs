//! HTTP client for the TeamDynamix Web API.
//!
//! This module provides the `TdxClient` struct for making authenticated
//! requests to the TDX REST API.
//!
//! # Authentication
//!
//! The client logs in lazily and caches the returned bearer token with the
//! expiry decoded from its `exp` claim:
//! - Proactive refresh: a token is replaced once `now >= exp - 5 minutes`.
//! - Reactive refresh: a 401 clears the cached token and the call is retried
//!   exactly once with a new one. A second 401 is surfaced as
//!   `TdxError::Authentication`.
//!
//! The check-expiry/login/store sequence runs under one lock, so concurrent
//! callers never log in twice for the same stale token.
//!
//! No other failure is retried.
//!
//! # Security
//!
//! Passwords, web services keys and tokens are never logged. Error bodies are
//! sanitized before they are returned.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, Credentials};
use crate::error::TdxError;
use crate::token::BearerToken;

/// Path for username/password login.
pub const AUTH_PATH: &str = "api/auth";

/// Path for BEID/web services key login.
pub const ADMIN_AUTH_PATH: &str = "api/auth/loginadmin";

/// Content type sent with every JSON request.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Maximum length for HTTP error response bodies kept in errors.
const MAX_ERROR_BODY_LEN: usize = 500;

/// HTTP client for the TeamDynamix Web API.
///
/// Cloning is cheap; clones share the cached token.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = TdxClient::new(&config)?;
///
/// let feed: Option<Vec<FeedEntry>> = client
///     .get("api/42/tickets/1001/feed", RequestOptions::new())
///     .await?;
/// ```
#[derive(Clone)]
pub struct TdxClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URL without trailing slash.
    base_url: String,

    /// Login credentials.
    /// SECURITY: Never log the secret half!
    credentials: Credentials,

    /// Timeout applied to each HTTP call.
    timeout: Duration,

    /// Cached token; `None` until the first login or after invalidation.
    session: Arc<Mutex<Option<BearerToken>>>,

    /// Most recent token value, kept outside `session` for redaction.
    /// Survives invalidation.
    last_token: Arc<RwLock<Option<String>>>,

    clock: Arc<dyn Clock>,
}

impl TdxClient {
    /// Creates a new client from configuration.
    ///
    /// No network call is made until the first request.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::HttpClient` if the HTTP client fails to initialize.
    pub fn new(config: &Config) -> Result<Self, TdxError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a new client that judges token freshness with `clock`.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, TdxError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TdxError::HttpClient)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials: config.credentials().clone(),
            timeout: config.timeout,
            session: Arc::new(Mutex::new(None)),
            last_token: Arc::new(RwLock::new(None)),
            clock,
        })
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The clock used for token freshness.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Returns a copy of the cached token, if any.
    pub async fn cached_token(&self) -> Option<BearerToken> {
        self.session.lock().await.clone()
    }

    /// Sanitizes an error's message so no credential secret appears in it.
    ///
    /// The most recent bearer token is redacted too, even while a refresh
    /// holds the session.
    pub fn sanitize_error(&self, error: &TdxError) -> String {
        let last_token = self
            .last_token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let token = last_token.as_deref().unwrap_or_default();
        error.sanitized_display(&[self.credentials.secret(), token])
    }

    fn remember_token(&self, token: &BearerToken) {
        let mut last_token = self
            .last_token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last_token = Some(token.value().to_string());
    }

    /// Joins the base URL and an API path (leading slash optional).
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Logs in and replaces the cached token.
    ///
    /// Uses the admin flow for BEID credentials and the user flow otherwise.
    ///
    /// # Errors
    ///
    /// - `TdxError::Credentials` if the API answers 401
    /// - `TdxError::Token` if the returned token is empty or has no `exp` claim
    /// - `TdxError::HttpStatus`, `TdxError::Http` or `TdxError::Timeout` for
    ///   any other failure
    pub async fn authenticate(&self) -> Result<(), TdxError> {
        let mut session = self.session.lock().await;
        let token = self.login().await?;
        self.remember_token(&token);
        *session = Some(token);
        Ok(())
    }

    /// Returns request headers carrying a token that is fresh right now.
    ///
    /// Logs in first when no token is cached or when
    /// `now >= expiry - REFRESH_BUFFER`.
    pub async fn ensure_fresh_headers(&self) -> Result<HeaderMap, TdxError> {
        let token = self.fresh_token().await?;
        Self::headers_for(&token)
    }

    fn headers_for(token: &BearerToken) -> Result<HeaderMap, TdxError> {
        let mut authorization = HeaderValue::from_str(&token.authorization())
            .map_err(|_| TdxError::token("token contains characters not allowed in a header"))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Ok(headers)
    }

    /// Drops the cached token so the next call logs in again.
    pub async fn invalidate_token(&self) {
        *self.session.lock().await = None;
    }

    /// Get-or-refresh under the session lock.
    async fn fresh_token(&self) -> Result<BearerToken, TdxError> {
        let mut session = self.session.lock().await;
        let now = self.clock.now();

        if let Some(token) = session.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.clone());
        }

        tracing::debug!(
            had_token = session.is_some(),
            "Bearer token missing or due for refresh"
        );
        let token = self.login().await?;
        self.remember_token(&token);
        *session = Some(token.clone());
        Ok(token)
    }

    /// Performs the login call without touching the cache.
    async fn login(&self) -> Result<BearerToken, TdxError> {
        let (path, payload, rejected) = match &self.credentials {
            Credentials::Admin {
                beid,
                web_services_key,
            } => (
                ADMIN_AUTH_PATH,
                serde_json::json!({ "BEID": beid, "WebServicesKey": web_services_key }),
                "invalid administrative credentials",
            ),
            Credentials::Password { username, password } => (
                AUTH_PATH,
                serde_json::json!({ "username": username, "password": password }),
                "invalid credentials",
            ),
        };

        tracing::debug!(admin = self.credentials.is_admin(), "Authenticating with TeamDynamix");

        let response = self
            .http
            .post(self.url(path))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(serde_json::to_vec(&payload)?)
            .send()
            .await
            .map_err(|e| TdxError::from_transport(e, self.timeout, format!("POST {}", path)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(admin = self.credentials.is_admin(), "Login rejected");
            return Err(TdxError::credentials(rejected));
        }
        if !status.is_success() {
            return Err(self.status_error(status, response, None).await);
        }

        let body = response.text().await.map_err(TdxError::Http)?;
        let token = BearerToken::parse(&body)?;

        tracing::info!(expires_at = %token.expires_at(), "Authenticated with TeamDynamix");
        Ok(token)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Makes a request to the TDX API.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g., `api/42/tickets`)
    /// * `options` - Query parameters, JSON body and file parts
    ///
    /// # Returns
    ///
    /// `None` for a success response with an empty body, otherwise the body
    /// decoded as `T`.
    ///
    /// # Errors
    ///
    /// - `TdxError::Authentication` if the retry after a 401 is also a 401
    /// - `TdxError::HttpStatus` for any other non-success status
    /// - login errors from [`TdxClient::authenticate`]
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>, TdxError>
    where
        T: DeserializeOwned,
    {
        if options.json.is_some() && !options.files.is_empty() {
            return Err(TdxError::validation(
                "a request cannot carry both a JSON body and file parts",
            ));
        }

        let url = self.url(path);

        tracing::debug!(
            method = %method,
            path = %path,
            "Making TDX API request"
        );

        let mut token = self.fresh_token().await?;
        let mut response = self
            .send(&method, &url, path, Self::headers_for(&token)?, &options)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(
                method = %method,
                path = %path,
                "Request unauthorized, re-authenticating and retrying once"
            );
            self.invalidate_token().await;
            token = self.fresh_token().await?;
            response = self
                .send(&method, &url, path, Self::headers_for(&token)?, &options)
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                return Err(TdxError::Authentication);
            }
        }

        let status = response.status();
        if !status.is_success() {
            let err = self.status_error(status, response, Some(token.value())).await;
            tracing::warn!(
                method = %method,
                path = %path,
                status = %status,
                "TDX API request failed"
            );
            return Err(err);
        }

        let body = response.text().await.map_err(TdxError::Http)?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(TdxError::Serialization)
    }

    /// Sends one attempt of a request.
    async fn send(
        &self,
        method: &Method,
        url: &str,
        path: &str,
        mut headers: HeaderMap,
        options: &RequestOptions,
    ) -> Result<Response, TdxError> {
        let mut req = self.http.request(method.clone(), url);

        if !options.query.is_empty() {
            req = req.query(&options.query);
        }

        if options.files.is_empty() {
            if let Some(ref body) = options.json {
                req = req.body(serde_json::to_vec(body)?);
            }
        } else {
            // Multipart sets its own boundary content type.
            headers.remove(CONTENT_TYPE);
            let mut form = Form::new();
            for file in &options.files {
                form = form.part(file.field.clone(), file.to_part()?);
            }
            req = req.multipart(form);
        }

        req.headers(headers)
            .send()
            .await
            .map_err(|e| TdxError::from_transport(e, self.timeout, format!("{} {}", method, path)))
    }

    /// Converts a non-success response into `TdxError::HttpStatus`.
    async fn status_error(
        &self,
        status: StatusCode,
        response: Response,
        token: Option<&str>,
    ) -> TdxError {
        let body = response.text().await.unwrap_or_default();
        let body = TdxError::sanitize_message(
            &body,
            &[self.credentials.secret(), token.unwrap_or_default()],
        );

        TdxError::HttpStatus {
            status,
            body: truncate_body(body),
        }
    }

    // ========================================================================
    // HTTP verbs
    // ========================================================================

    /// Makes a GET request.
    pub async fn get<T>(&self, path: &str, options: RequestOptions) -> Result<Option<T>, TdxError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, path, options).await
    }

    /// Makes a POST request.
    pub async fn post<T>(&self, path: &str, options: RequestOptions) -> Result<Option<T>, TdxError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, options).await
    }

    /// Makes a PUT request.
    pub async fn put<T>(&self, path: &str, options: RequestOptions) -> Result<Option<T>, TdxError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, options).await
    }

    /// Makes a PATCH request.
    pub async fn patch<T>(&self, path: &str, options: RequestOptions) -> Result<Option<T>, TdxError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::PATCH, path, options).await
    }

    /// Makes a DELETE request.
    pub async fn delete<T>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<T>, TdxError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, options).await
    }
}

/// Truncates an error body on a character boundary.
fn truncate_body(body: String) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LEN {
        let kept: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
        format!("{}...[truncated]", kept)
    } else {
        body
    }
}

/// Query parameters, JSON body and file parts for a single request.
///
/// Kept as plain data so the request can be rebuilt for the retry after a 401.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    query: Vec<(String, String)>,
    json: Option<serde_json::Value>,
    files: Vec<FilePart>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Sets the JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Serializes `body` and sets it as the JSON body.
    pub fn with_body<B: Serialize>(self, body: &B) -> Result<Self, TdxError> {
        Ok(self.with_json(serde_json::to_value(body)?))
    }

    /// Adds a multipart file part.
    pub fn with_file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    /// Query parameters in insertion order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// The JSON body, if any.
    pub fn json(&self) -> Option<&serde_json::Value> {
        self.json.as_ref()
    }
}

/// A file sent as one part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name.
    pub field: String,
    /// File name reported to the server.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
    /// MIME type; left to the server when absent.
    pub mime: Option<String>,
}

impl FilePart {
    /// Creates a part for the conventional `file` field.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            field: "file".to_string(),
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    /// Sets the MIME type.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn to_part(&self) -> Result<Part, TdxError> {
        let part = Part::bytes(self.bytes.clone()).file_name(self.file_name.clone());
        match self.mime {
            Some(ref mime) => part.mime_str(mime).map_err(|_| {
                TdxError::validation(format!("invalid MIME type for {}: {}", self.file_name, mime))
            }),
            None => Ok(part),
        }
    }
}
