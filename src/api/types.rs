//! Wire types for the MindMend REST API

use crate::format::{de_optional_timestamp, de_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned conversation identifier
pub type ConversationId = i64;

/// Server-assigned user identifier
pub type UserId = i64;

// ============================================================================
// Conversations & messages
// ============================================================================

/// One row of `GET /api/conversations`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub preview: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(deserialize_with = "de_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// Coarse sentiment label attached by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    /// Any label this client does not know about
    #[serde(other)]
    Unknown,
}

impl Sentiment {
    /// Emoji appended after the message text
    pub fn icon(&self) -> Option<&'static str> {
        match self {
            Sentiment::Negative => Some("😢"),
            Sentiment::Positive => Some("😊"),
            Sentiment::Neutral => Some("😐"),
            Sentiment::Unknown => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Unknown => "unknown",
        }
    }
}

/// A chat message, either loaded from history or created locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// `None` for messages that only exist in this client (optimistic or local errors)
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// A message created on this side, stamped now, never persisted by us
    pub fn local(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            id: None,
            conversation_id: None,
            sender,
            content: content.into(),
            sentiment: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_sentiment(mut self, sentiment: Option<Sentiment>) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn in_conversation(mut self, id: Option<ConversationId>) -> Self {
        self.conversation_id = id;
        self
    }
}

/// Conversation header inside `GET /api/conversations/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHeader {
    pub id: ConversationId,
    pub title: String,
}

/// Response of `GET /api/conversations/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub conversation: ConversationHeader,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConversationList {
    #[serde(default)]
    pub conversations: Vec<ConversationSummary>,
}

// ============================================================================
// Chat
// ============================================================================

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Omitted for a new, unsaved conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Preferred video type for recommendations (e.g. "meditation")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_preference: Option<String>,
}

/// Response of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    #[serde(default)]
    pub show_resources: bool,
    #[serde(default)]
    pub resources: Option<ResourceBundle>,
    #[serde(default)]
    pub is_crisis: bool,
    #[serde(default)]
    pub emergency_resources: Vec<EmergencyContact>,
}

/// Curated supplementary content returned with some replies
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceBundle {
    #[serde(default)]
    pub videos: Vec<Video>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub professional_resources: Vec<ProfessionalResource>,
}

impl ResourceBundle {
    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
            && self.exercises.is_empty()
            && self.articles.is_empty()
            && self.professional_resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub benefit: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfessionalResource {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
}

/// Emergency service shown when the backend flags a crisis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub service: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub available: Option<String>,
}

// ============================================================================
// Auth
// ============================================================================

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of `POST /api/auth/signup`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// `{ "error": "..." }` body carried by non-2xx responses
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_conversations: u64,
    pub total_messages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_optional_timestamp")]
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConversation {
    pub id: ConversationId,
    /// Owner id; older backends only send `username`
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub username: String,
    #[serde(default)]
    pub user_email: String,
    pub title: String,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "de_timestamp")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsEnvelope {
    pub stats: AdminStats,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersEnvelope {
    #[serde(default)]
    pub users: Vec<AdminUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdminConversationsEnvelope {
    #[serde(default)]
    pub conversations: Vec<AdminConversation>,
}
