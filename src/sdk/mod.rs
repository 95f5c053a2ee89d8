//! Client SDK for the CursorConnect API
//!
//! A thin typed client over the REST surface plus the streaming consumer
//! that decodes the relay's SSE frames into incremental callbacks.

pub mod stream;

pub use stream::{Frame, FrameDecoder, StreamHandle};

use crate::auth::TokenPair;
use crate::utils::error::{Result, ServiceError};
use futures::future::{AbortHandle, Abortable};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use tracing::debug;
use uuid::Uuid;

/// Typed client for the service API
#[derive(Debug, Clone)]
pub struct ServiceClient {
    base_url: String,
    http_client: reqwest::Client,
    token: Option<String>,
}

/// Response envelope used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

/// Authenticated session returned by register/login
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    /// Issued access token
    pub access_token: String,
    /// Issued refresh token
    pub refresh_token: String,
    /// Authenticated user
    pub user: UserProfile,
}

/// Public user profile
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    /// User ID
    pub id: Uuid,
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
}

/// A generated completion
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResult {
    /// Persisted interaction ID, when recorded
    pub id: Option<Uuid>,
    /// The generated response text
    pub response: String,
    /// Completion metadata
    pub metadata: serde_json::Value,
}

impl ServiceClient {
    /// Create a client for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client: reqwest::Client::new(),
            token: None,
        }
    }

    /// Attach a Bearer token for authenticated requests
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http_client.request(method, self.url(path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ServiceError::internal(format!("Invalid response body: {}", e)))?;

        if !envelope.success {
            let message = envelope
                .error
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            return Err(ServiceError::internal(message));
        }

        envelope
            .data
            .ok_or_else(|| ServiceError::internal("Response missing data field"))
    }

    /// Register a new account and store its access token on the client
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession> {
        let response = self
            .request(reqwest::Method::POST, "/api/auth/register")
            .json(&json!({ "username": username, "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ServiceError::internal(format!("Request failed: {}", e)))?;

        let session: AuthSession = Self::decode(response).await?;
        self.token = Some(session.access_token.clone());
        Ok(session)
    }

    /// Log in and store the access token on the client
    pub async fn login(&mut self, email: &str, password: &str) -> Result<AuthSession> {
        let response = self
            .request(reqwest::Method::POST, "/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| ServiceError::internal(format!("Request failed: {}", e)))?;

        let session: AuthSession = Self::decode(response).await?;
        self.token = Some(session.access_token.clone());
        Ok(session)
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&mut self, refresh_token: &str) -> Result<TokenPair> {
        #[derive(Deserialize)]
        struct RefreshData {
            access_token: String,
            refresh_token: String,
            token_type: String,
            expires_in: u64,
        }

        let response = self
            .request(reqwest::Method::POST, "/api/auth/refresh")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| ServiceError::internal(format!("Request failed: {}", e)))?;

        let data: RefreshData = Self::decode(response).await?;
        self.token = Some(data.access_token.clone());
        Ok(TokenPair {
            access_token: data.access_token,
            refresh_token: data.refresh_token,
            token_type: data.token_type,
            expires_in: data.expires_in,
        })
    }

    /// Request a whole completion
    pub async fn generate(&self, query: &str) -> Result<GenerateResult> {
        let response = self
            .request(reqwest::Method::POST, "/api/generate")
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ServiceError::internal(format!("Request failed: {}", e)))?;

        Self::decode(response).await
    }

    /// Stream a completion, invoking the callback after every frame
    ///
    /// The callback receives the accumulated text so far and whether the
    /// stream has finished. Frames that fail to parse are skipped. Returns
    /// the full accumulated text.
    pub async fn stream_query<F>(&self, query: &str, mut on_frame: F) -> Result<String>
    where
        F: FnMut(&str, bool),
    {
        let response = self
            .request(reqwest::Method::POST, "/api/generate/stream")
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ServiceError::internal(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::internal(format!(
                "Stream request failed with status {}",
                status
            )));
        }

        let mut byte_stream = response.bytes_stream();
        let mut decoder = FrameDecoder::new();
        let mut accumulated = String::new();

        while let Some(next) = byte_stream.next().await {
            let bytes = next
                .map_err(|e| ServiceError::internal(format!("Stream read failed: {}", e)))?;

            for frame in decoder.push(&bytes) {
                match frame {
                    Frame::Content(text) => {
                        accumulated.push_str(&text);
                        on_frame(&accumulated, false);
                    }
                    Frame::Done => {
                        on_frame(&accumulated, true);
                        return Ok(accumulated);
                    }
                    Frame::Error(message) => {
                        return Err(ServiceError::internal(message));
                    }
                }
            }
        }

        debug!("stream closed without terminal frame");
        Ok(accumulated)
    }

    /// Stream a completion with a cancellation handle
    ///
    /// Cancelling aborts the underlying request and stops further callback
    /// invocations; the future then resolves to `Ok(None)`.
    pub fn stream_query_cancellable<F>(
        &self,
        query: String,
        on_frame: F,
    ) -> (StreamHandle, impl Future<Output = Result<Option<String>>>)
    where
        F: FnMut(&str, bool),
    {
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let client = self.clone();

        let future = async move {
            match Abortable::new(client.stream_query(&query, on_frame), abort_registration).await {
                Ok(result) => result.map(Some),
                Err(_aborted) => Ok(None),
            }
        };

        (StreamHandle::new(abort_handle), future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ServiceClient::new("http://localhost:5000/");
        assert_eq!(client.url("/api/health"), "http://localhost:5000/api/health");

        let no_slash = ServiceClient::new("http://localhost:5000");
        assert_eq!(
            no_slash.url("/api/health"),
            "http://localhost:5000/api/health"
        );
    }

    #[test]
    fn test_with_token() {
        let client = ServiceClient::new("http://localhost:5000").with_token("abc");
        assert_eq!(client.token.as_deref(), Some("abc"));
    }
}
