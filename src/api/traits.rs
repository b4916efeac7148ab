//! Trait abstraction for the MindMend backend

use super::error::ApiError;
use super::types::*;
use async_trait::async_trait;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every backend call the client makes.
///
/// Implementations must be thread-safe (`Send + Sync`) so a single backend can be
/// shared by all controllers of a page through `Arc<dyn ApiBackend>`.
///
/// # Implementations
///
/// - [`HttpBackend`](super::HttpBackend): reqwest client for the real `/api/*` endpoints
/// - [`MockBackend`](super::MockBackend): in-memory backend with scripted replies (for tests)
#[async_trait]
pub trait ApiBackend: Send + Sync {
    // ========================================================================
    // Chat
    // ========================================================================

    /// `POST /api/chat`
    async fn send_chat(&self, request: &ChatRequest) -> ApiResult<ChatReply>;

    /// `POST /api/reset`: drop the server-side dialogue state
    async fn reset_session(&self) -> ApiResult<()>;

    // ========================================================================
    // Conversations
    // ========================================================================

    /// `GET /api/conversations`, in server order
    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>>;

    /// `GET /api/conversations/{id}`
    async fn get_conversation(&self, id: ConversationId) -> ApiResult<ConversationDetail>;

    /// `DELETE /api/conversations/{id}`
    async fn delete_conversation(&self, id: ConversationId) -> ApiResult<()>;

    // ========================================================================
    // Auth
    // ========================================================================

    /// `POST /api/auth/login`
    async fn login(&self, request: &LoginRequest) -> ApiResult<()>;

    /// `POST /api/auth/signup`
    async fn signup(&self, request: &SignupRequest) -> ApiResult<()>;

    /// `POST /api/auth/logout`
    async fn logout(&self) -> ApiResult<()>;

    // ========================================================================
    // Admin
    // ========================================================================

    /// `GET /api/admin/stats`
    async fn admin_stats(&self) -> ApiResult<AdminStats>;

    /// `GET /api/admin/users`
    async fn admin_users(&self) -> ApiResult<Vec<AdminUser>>;

    /// `GET /api/admin/conversations`
    async fn admin_conversations(&self) -> ApiResult<Vec<AdminConversation>>;
}
