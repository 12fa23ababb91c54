//! HTTP client for the attendance backend
//!
//! Every request goes through [`ApiClient::send`], which:
//! - attaches the persisted bearer token when one exists
//! - on 401 clears the token, emits `LoggedOut`, asks the front end to show
//!   login, and returns [`ClientError::Unauthorized`]
//! - maps transport failures to [`ClientError::Network`]
//! - extracts a readable message from error bodies

use reqwest::{multipart, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use rollcall_common::config::DashboardConfig;
use rollcall_common::events::{DashboardEvent, EventBus};
use rollcall_common::token::TokenStore;

use crate::error::ClientError;
use crate::notify::Notifier;

const USER_AGENT: &str = concat!("rollcall/", env!("CARGO_PKG_VERSION"));

/// Rows requested per page from `skip`/`limit` list endpoints (the server's default limit)
pub const LIST_PAGE_SIZE: usize = 100;

/// Upper bound on pages fetched for one list
const MAX_LIST_PAGES: usize = 1000;

/// Successful response: HTTP status plus decoded body
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
}

/// Authenticated client for one backend origin
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
    events: Arc<EventBus>,
}

impl ApiClient {
    pub fn new(
        config: &DashboardConfig,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
        events: Arc<EventBus>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            tokens,
            notifier,
            events,
        })
    }

    /// Backend origin without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path (leading slash optional)
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Issue a JSON request
    pub async fn request<T, B>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.http.request(method, self.url(endpoint));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder, endpoint, true).await
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::GET, endpoint, None)
            .await
            .map(|r| r.data)
    }

    /// Every row of a `skip`/`limit` list endpoint
    ///
    /// Pages are requested until one comes back shorter than `page_size`.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page_size: usize,
    ) -> Result<Vec<T>, ClientError> {
        let page_size = page_size.max(1);
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        let mut rows: Vec<T> = Vec::new();

        for page_number in 0..MAX_LIST_PAGES {
            let page: Vec<T> = self
                .get(&format!(
                    "{}{}skip={}&limit={}",
                    endpoint,
                    separator,
                    rows.len(),
                    page_size
                ))
                .await?;
            let last = page.len() < page_size;
            rows.extend(page);
            if last {
                debug!(endpoint = %endpoint, pages = page_number + 1, rows = rows.len(), "Fetched list");
                return Ok(rows);
            }
        }

        warn!(endpoint = %endpoint, rows = rows.len(), "List still growing after page limit, stopping");
        Ok(rows)
    }

    pub async fn post<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, endpoint, Some(body))
            .await
            .map(|r| r.data)
    }

    /// POST without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::POST, endpoint, None)
            .await
            .map(|r| r.data)
    }

    pub async fn put<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, endpoint, Some(body))
            .await
            .map(|r| r.data)
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ClientError> {
        self.request::<T, ()>(Method::DELETE, endpoint, None)
            .await
            .map(|r| r.data)
    }

    /// Multipart upload; same auth and error handling as JSON requests, but
    /// no JSON content type (reqwest sets the multipart boundary header)
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: multipart::Form,
    ) -> Result<T, ClientError> {
        let builder = self.http.post(self.url(endpoint)).multipart(form);
        self.send(builder, endpoint, true).await.map(|r| r.data)
    }

    /// POST that does not treat 401 as session expiry (used by login, where a
    /// 401 means wrong credentials)
    pub async fn post_unauthenticated<T, B>(&self, endpoint: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.http.post(self.url(endpoint)).json(body);
        self.send(builder, endpoint, false).await.map(|r| r.data)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
        session_bound: bool,
    ) -> Result<ApiResponse<T>, ClientError> {
        let builder = match self.tokens.load() {
            Some(token) if session_bound => builder.bearer_auth(token),
            _ => builder,
        };

        debug!(endpoint = %endpoint, "Sending request");

        let response = builder.send().await.map_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Request failed");
            ClientError::Network(e.to_string())
        })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED && session_bound {
            self.end_session(endpoint);
            return Err(ClientError::Unauthorized);
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = extract_error_message(status.as_u16(), &body);
            warn!(endpoint = %endpoint, status = status.as_u16(), message = %message, "API error");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        let data = serde_json::from_str(text).map_err(|e| {
            warn!(endpoint = %endpoint, error = %e, "Could not decode response");
            ClientError::Parse(e.to_string())
        })?;

        Ok(ApiResponse {
            status: status.as_u16(),
            data,
        })
    }

    fn end_session(&self, endpoint: &str) {
        warn!(endpoint = %endpoint, "Server rejected credentials, ending session");
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Could not clear stored token");
        }
        self.events.emit_lossy(DashboardEvent::LoggedOut);
        self.notifier.redirect_to_login();
    }
}

/// Human-readable message from an error body
///
/// Uses `detail` or `message` when present (stringifying non-string values),
/// otherwise the whole JSON value, otherwise the raw text.
///
/// # Examples
///
/// ```
/// use rollcall_dashboard::client::extract_error_message;
///
/// assert_eq!(extract_error_message(404, r#"{"detail": "Student not found"}"#), "Student not found");
/// assert_eq!(extract_error_message(502, "Bad Gateway"), "Bad Gateway");
/// assert_eq!(extract_error_message(500, ""), "Request failed with status 500");
/// ```
pub fn extract_error_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("Request failed with status {}", status);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => {
            for key in ["detail", "message"] {
                match value.get(key) {
                    Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
                    Some(Value::Null) | None => {}
                    Some(Value::String(_)) => {}
                    Some(other) => return other.to_string(),
                }
            }
            value.to_string()
        }
        Err(_) => trimmed.to_string(),
    }
}
