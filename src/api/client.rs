//! HTTP implementation of [`ApiBackend`] on top of reqwest

use super::error::ApiError;
use super::traits::{ApiBackend, ApiResult};
use super::types::*;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Client for the MindMend `/api/*` endpoints.
///
/// Keeps a cookie store so the session cookie set by login is sent with every
/// later call. Cheap to clone (shares the reqwest client internally).
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for `base_url` (e.g. `http://localhost:5000`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a backend from the loaded [`Config`](crate::Config).
    pub fn from_config(config: &crate::Config) -> ApiResult<Self> {
        Self::new(&config.server_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and turn non-2xx statuses into [`ApiError::Application`].
    async fn dispatch(&self, request: RequestBuilder, label: &str) -> ApiResult<Response> {
        let response = request.send().await.map_err(|e| {
            warn!(endpoint = label, error = %e, "Request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(endpoint = label, status = status.as_u16(), "Request completed");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        warn!(
            endpoint = label,
            status = status.as_u16(),
            error = message.as_deref().unwrap_or(""),
            "Backend rejected request"
        );
        Err(ApiError::Application {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        label: &str,
    ) -> ApiResult<T> {
        let response = self.dispatch(request, label).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("{label}: {e}")))
    }
}

#[async_trait]
impl ApiBackend for HttpBackend {
    async fn send_chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        self.fetch_json(
            self.client.post(self.url("/api/chat")).json(request),
            "POST /api/chat",
        )
        .await
    }

    async fn reset_session(&self) -> ApiResult<()> {
        self.dispatch(self.client.post(self.url("/api/reset")), "POST /api/reset")
            .await
            .map(|_| ())
    }

    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        let list: ConversationList = self
            .fetch_json(
                self.client.get(self.url("/api/conversations")),
                "GET /api/conversations",
            )
            .await?;
        Ok(list.conversations)
    }

    async fn get_conversation(&self, id: ConversationId) -> ApiResult<ConversationDetail> {
        self.fetch_json(
            self.client.get(self.url(&format!("/api/conversations/{id}"))),
            "GET /api/conversations/{id}",
        )
        .await
    }

    async fn delete_conversation(&self, id: ConversationId) -> ApiResult<()> {
        self.dispatch(
            self.client
                .delete(self.url(&format!("/api/conversations/{id}"))),
            "DELETE /api/conversations/{id}",
        )
        .await
        .map(|_| ())
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<()> {
        self.dispatch(
            self.client.post(self.url("/api/auth/login")).json(request),
            "POST /api/auth/login",
        )
        .await
        .map(|_| ())
    }

    async fn signup(&self, request: &SignupRequest) -> ApiResult<()> {
        self.dispatch(
            self.client.post(self.url("/api/auth/signup")).json(request),
            "POST /api/auth/signup",
        )
        .await
        .map(|_| ())
    }

    async fn logout(&self) -> ApiResult<()> {
        self.dispatch(
            self.client.post(self.url("/api/auth/logout")),
            "POST /api/auth/logout",
        )
        .await
        .map(|_| ())
    }

    async fn admin_stats(&self) -> ApiResult<AdminStats> {
        let envelope: StatsEnvelope = self
            .fetch_json(
                self.client.get(self.url("/api/admin/stats")),
                "GET /api/admin/stats",
            )
            .await?;
        Ok(envelope.stats)
    }

    async fn admin_users(&self) -> ApiResult<Vec<AdminUser>> {
        let envelope: UsersEnvelope = self
            .fetch_json(
                self.client.get(self.url("/api/admin/users")),
                "GET /api/admin/users",
            )
            .await?;
        Ok(envelope.users)
    }

    async fn admin_conversations(&self) -> ApiResult<Vec<AdminConversation>> {
        let envelope: AdminConversationsEnvelope = self
            .fetch_json(
                self.client.get(self.url("/api/admin/conversations")),
                "GET /api/admin/conversations",
            )
            .await?;
        Ok(envelope.conversations)
    }
}
