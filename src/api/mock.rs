//! In-memory mock implementation of ApiBackend for testing without a real backend.

use super::error::ApiError;
use super::traits::{ApiBackend, ApiResult};
use super::types::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, RwLock};

/// Reply text used when no reply was scripted
pub const DEFAULT_REPLY: &str = "I hear you. Tell me more about how you're feeling.";

/// Identifies one backend endpoint, for failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Chat,
    Reset,
    ListConversations,
    GetConversation,
    DeleteConversation,
    Login,
    Signup,
    Logout,
    AdminStats,
    AdminUsers,
    AdminConversations,
}

#[derive(Default)]
struct MockState {
    /// Conversations in server order, each with its stored messages
    conversations: Vec<(ConversationSummary, Vec<Message>)>,
    next_conversation_id: ConversationId,
    scripted_replies: VecDeque<ApiResult<ChatReply>>,
    chat_requests: Vec<ChatRequest>,
    failures: HashMap<Endpoint, ApiError>,
    calls: Vec<Endpoint>,
    accounts: HashMap<String, (String, String)>,
    logged_in: Option<String>,
    stats: AdminStats,
    users: Vec<AdminUser>,
    admin_conversations: Vec<AdminConversation>,
}

/// In-memory mock implementation of ApiBackend for testing.
///
/// Conversations live in a `Vec` behind an async `RwLock`, in the order the list
/// endpoint returns them. Chat replies come from a script queue; when the queue is
/// empty the mock answers with [`DEFAULT_REPLY`] and stores both messages, creating
/// a conversation on the first message. Any endpoint can be made to fail with
/// [`MockBackend::fail`].
///
/// # Example
///
/// ```rust
/// use mindmend_client::api::{ApiBackend, ChatRequest, MockBackend};
///
/// # tokio_test::block_on(async {
/// let backend = MockBackend::new();
/// let reply = backend
///     .send_chat(&ChatRequest { message: "hi".into(), conversation_id: None, mood_preference: None })
///     .await
///     .unwrap();
/// assert_eq!(reply.conversation_id, Some(1));
/// assert_eq!(backend.list_conversations().await.unwrap().len(), 1);
/// # });
/// ```
pub struct MockBackend {
    state: RwLock<MockState>,
    chat_held: AtomicBool,
    chat_release: Notify,
}

impl MockBackend {
    /// Create a new empty mock backend.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState {
                next_conversation_id: 1,
                ..MockState::default()
            }),
            chat_held: AtomicBool::new(false),
            chat_release: Notify::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Seeding (builder style, before the mock is shared)
    // ------------------------------------------------------------------------

    /// Seed a conversation; it is listed after the ones already seeded.
    pub fn with_conversation(mut self, summary: ConversationSummary, messages: Vec<Message>) -> Self {
        let state = self.state.get_mut();
        state.next_conversation_id = state.next_conversation_id.max(summary.id + 1);
        state.conversations.push((summary, messages));
        self
    }

    /// Register an account that `login` accepts.
    pub fn with_account(mut self, username: &str, email: &str, password: &str) -> Self {
        self.state.get_mut().accounts.insert(
            username.to_string(),
            (email.to_string(), password.to_string()),
        );
        self
    }

    pub fn with_admin_data(
        mut self,
        stats: AdminStats,
        users: Vec<AdminUser>,
        conversations: Vec<AdminConversation>,
    ) -> Self {
        let state = self.state.get_mut();
        state.stats = stats;
        state.users = users;
        state.admin_conversations = conversations;
        self
    }

    // ------------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------------

    /// Queue the next `send_chat` result.
    pub async fn push_reply(&self, reply: ApiResult<ChatReply>) {
        self.state.write().await.scripted_replies.push_back(reply);
    }

    /// Make `endpoint` fail with `error` until [`MockBackend::recover`] is called.
    pub async fn fail(&self, endpoint: Endpoint, error: ApiError) {
        self.state.write().await.failures.insert(endpoint, error);
    }

    pub async fn recover(&self, endpoint: Endpoint) {
        self.state.write().await.failures.remove(&endpoint);
    }

    /// Make `send_chat` wait until [`MockBackend::release_chat`] is called.
    pub fn hold_chat(&self) {
        self.chat_held.store(true, Ordering::SeqCst);
    }

    pub fn release_chat(&self) {
        self.chat_held.store(false, Ordering::SeqCst);
        self.chat_release.notify_waiters();
    }

    /// Remove a conversation behind the client's back.
    pub async fn remove_remote(&self, id: ConversationId) {
        self.state
            .write()
            .await
            .conversations
            .retain(|(summary, _)| summary.id != id);
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Every `send_chat` request received, in order.
    pub async fn chat_requests(&self) -> Vec<ChatRequest> {
        self.state.read().await.chat_requests.clone()
    }

    pub async fn call_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .read()
            .await
            .calls
            .iter()
            .filter(|e| **e == endpoint)
            .count()
    }

    pub async fn total_calls(&self) -> usize {
        self.state.read().await.calls.len()
    }

    pub async fn logged_in_user(&self) -> Option<String> {
        self.state.read().await.logged_in.clone()
    }

    /// Record the call and return the injected failure, if any.
    async fn enter(&self, endpoint: Endpoint) -> ApiResult<()> {
        let mut state = self.state.write().await;
        state.calls.push(endpoint);
        match state.failures.get(&endpoint) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::application(404, format!("{what} not found"))
}

#[async_trait]
impl ApiBackend for MockBackend {
    async fn send_chat(&self, request: &ChatRequest) -> ApiResult<ChatReply> {
        // Register as a waiter before reading the flag so a release in between is not lost
        let released = self.chat_release.notified();
        tokio::pin!(released);
        released.as_mut().enable();
        if self.chat_held.load(Ordering::SeqCst) {
            released.await;
        }
        self.enter(Endpoint::Chat).await?;

        let mut state = self.state.write().await;
        state.chat_requests.push(request.clone());
        if let Some(scripted) = state.scripted_replies.pop_front() {
            return scripted;
        }

        let id = match request.conversation_id {
            Some(id) => id,
            None => {
                let id = state.next_conversation_id;
                state.next_conversation_id += 1;
                let title: String = request.message.chars().take(30).collect();
                state.conversations.insert(
                    0,
                    (
                        ConversationSummary {
                            id,
                            title,
                            preview: String::new(),
                            message_count: 0,
                            updated_at: Utc::now(),
                        },
                        Vec::new(),
                    ),
                );
                id
            }
        };

        let Some((summary, messages)) = state
            .conversations
            .iter_mut()
            .find(|(summary, _)| summary.id == id)
        else {
            return Err(not_found("Conversation"));
        };
        messages.push(Message::local(Sender::User, request.message.clone()).in_conversation(Some(id)));
        messages.push(
            Message::local(Sender::Bot, DEFAULT_REPLY)
                .with_sentiment(Some(Sentiment::Neutral))
                .in_conversation(Some(id)),
        );
        summary.message_count = messages.len() as u32;
        summary.preview = request.message.clone();
        summary.updated_at = Utc::now();

        Ok(ChatReply {
            message: DEFAULT_REPLY.to_string(),
            sentiment: Some(Sentiment::Neutral),
            conversation_id: Some(id),
            ..ChatReply::default()
        })
    }

    async fn reset_session(&self) -> ApiResult<()> {
        self.enter(Endpoint::Reset).await
    }

    async fn list_conversations(&self) -> ApiResult<Vec<ConversationSummary>> {
        self.enter(Endpoint::ListConversations).await?;
        let state = self.state.read().await;
        Ok(state
            .conversations
            .iter()
            .map(|(summary, _)| summary.clone())
            .collect())
    }

    async fn get_conversation(&self, id: ConversationId) -> ApiResult<ConversationDetail> {
        self.enter(Endpoint::GetConversation).await?;
        let state = self.state.read().await;
        state
            .conversations
            .iter()
            .find(|(summary, _)| summary.id == id)
            .map(|(summary, messages)| ConversationDetail {
                conversation: ConversationHeader {
                    id: summary.id,
                    title: summary.title.clone(),
                },
                messages: messages.clone(),
            })
            .ok_or_else(|| not_found("Conversation"))
    }

    async fn delete_conversation(&self, id: ConversationId) -> ApiResult<()> {
        self.enter(Endpoint::DeleteConversation).await?;
        let mut state = self.state.write().await;
        let before = state.conversations.len();
        state.conversations.retain(|(summary, _)| summary.id != id);
        if state.conversations.len() == before {
            return Err(not_found("Conversation"));
        }
        Ok(())
    }

    async fn login(&self, request: &LoginRequest) -> ApiResult<()> {
        self.enter(Endpoint::Login).await?;
        let mut state = self.state.write().await;
        match state.accounts.get(&request.username) {
            Some((_, password)) if *password == request.password => {
                state.logged_in = Some(request.username.clone());
                Ok(())
            }
            _ => Err(ApiError::application(401, "Invalid username or password")),
        }
    }

    async fn signup(&self, request: &SignupRequest) -> ApiResult<()> {
        self.enter(Endpoint::Signup).await?;
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&request.username) {
            return Err(ApiError::application(400, "Username already exists"));
        }
        state.accounts.insert(
            request.username.clone(),
            (request.email.clone(), request.password.clone()),
        );
        Ok(())
    }

    async fn logout(&self) -> ApiResult<()> {
        self.enter(Endpoint::Logout).await?;
        self.state.write().await.logged_in = None;
        Ok(())
    }

    async fn admin_stats(&self) -> ApiResult<AdminStats> {
        self.enter(Endpoint::AdminStats).await?;
        Ok(self.state.read().await.stats)
    }

    async fn admin_users(&self) -> ApiResult<Vec<AdminUser>> {
        self.enter(Endpoint::AdminUsers).await?;
        Ok(self.state.read().await.users.clone())
    }

    async fn admin_conversations(&self) -> ApiResult<Vec<AdminConversation>> {
        self.enter(Endpoint::AdminConversations).await?;
        Ok(self.state.read().await.admin_conversations.clone())
    }
}
