//! Conversation store: the client-side view-model
//!
//! Holds the cached conversation list and the [`ActiveSession`] and keeps them
//! in sync with the backend.
//!
//! Responses can arrive out of order (a slow load of X finishing after a load of
//! Y was issued). Every list refresh and every load therefore takes a
//! monotonically increasing token (`begin_*`), and the matching `finish_*` only
//! applies a response whose token is still the latest one issued. The session
//! epoch plays the same role for chat replies: it changes whenever the active
//! conversation changes.

use crate::api::{
    ApiBackend, ApiError, ConversationDetail, ConversationId, ConversationSummary,
    EmergencyContact, Message, ResourceBundle, Sender,
};
use crate::events::{EventBus, ViewEvent};
use tracing::{debug, info, warn};

/// Greeting shown at the top of a new, unsaved conversation
pub const DEFAULT_GREETING: &str = "Hello! I'm MindMend, your mental health support companion. \
I'm here to listen, understand, and provide support. How are you feeling today?";

/// Text of the list failure state
pub const LIST_FAILED: &str = "Failed to load conversations";

/// One displayed item of the chat transcript
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Message(Message),
    /// Recommendations shown after a bot reply; display only
    Resources(ResourceBundle),
    /// Emergency contacts shown after a crisis reply; display only
    Emergency(Vec<EmergencyContact>),
    /// Placeholder shown while a reply is pending
    Typing,
}

impl TranscriptEntry {
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            TranscriptEntry::Message(m) => Some(m),
            _ => None,
        }
    }
}

/// Load state of the conversation list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    NotLoaded,
    Loaded,
    Failed(String),
}

/// Whether a `finish_*` call changed the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apply {
    Applied,
    /// A newer request was issued meanwhile; the response was discarded
    Stale,
}

/// Ticket for an in-flight list refresh
#[derive(Debug)]
#[must_use]
pub struct ListTicket {
    token: u64,
}

/// Ticket for an in-flight conversation load
#[derive(Debug)]
#[must_use]
pub struct LoadTicket {
    token: u64,
    id: ConversationId,
}

impl LoadTicket {
    pub fn conversation_id(&self) -> ConversationId {
        self.id
    }
}

/// The conversation currently shown in the chat pane
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    current_conversation_id: Option<ConversationId>,
    transcript: Vec<TranscriptEntry>,
    pending_send: bool,
    epoch: u64,
}

impl ActiveSession {
    /// `None` means a new conversation the backend has not saved yet
    pub fn current_conversation_id(&self) -> Option<ConversationId> {
        self.current_conversation_id
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Message entries of the transcript, in order
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.transcript.iter().filter_map(TranscriptEntry::as_message)
    }

    pub fn pending_send(&self) -> bool {
        self.pending_send
    }

    pub fn is_typing(&self) -> bool {
        self.transcript
            .iter()
            .any(|e| matches!(e, TranscriptEntry::Typing))
    }

    /// Changes whenever the active conversation changes
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// The view-model shared by the chat, sidebar and their renderers.
pub struct ConversationStore {
    conversations: Vec<ConversationSummary>,
    list_state: ListState,
    session: ActiveSession,
    greeting: String,
    last_list_token: u64,
    last_load_token: u64,
    events: EventBus,
}

impl ConversationStore {
    /// Create a store showing a new conversation.
    pub fn new(greeting: impl Into<String>, events: EventBus) -> Self {
        let greeting = greeting.into();
        Self {
            conversations: Vec::new(),
            list_state: ListState::NotLoaded,
            session: ActiveSession {
                current_conversation_id: None,
                transcript: vec![greeting_entry(&greeting)],
                pending_send: false,
                epoch: 0,
            },
            greeting,
            last_list_token: 0,
            last_load_token: 0,
            events,
        }
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn list_state(&self) -> &ListState {
        &self.list_state
    }

    pub fn session(&self) -> &ActiveSession {
        &self.session
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Conversation list
    // ========================================================================

    /// Fetch the conversation list.
    ///
    /// Never fails: on error the cached list is cleared, [`ListState::Failed`] is
    /// set and an empty vector is returned.
    pub async fn list_conversations(&mut self, api: &dyn ApiBackend) -> Vec<ConversationSummary> {
        let ticket = self.begin_list();
        let result = api.list_conversations().await;
        self.finish_list(ticket, result);
        self.conversations.clone()
    }

    pub fn begin_list(&mut self) -> ListTicket {
        self.last_list_token += 1;
        ListTicket {
            token: self.last_list_token,
        }
    }

    pub fn finish_list(
        &mut self,
        ticket: ListTicket,
        result: Result<Vec<ConversationSummary>, ApiError>,
    ) -> Apply {
        if ticket.token != self.last_list_token {
            debug!(
                token = ticket.token,
                latest = self.last_list_token,
                "Discarding stale conversation list"
            );
            return Apply::Stale;
        }

        match result {
            Ok(conversations) => {
                debug!(count = conversations.len(), "Conversation list loaded");
                self.conversations = conversations;
                self.list_state = ListState::Loaded;
                self.events.emit(ViewEvent::ConversationsChanged);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load conversations");
                self.conversations.clear();
                self.list_state = ListState::Failed(LIST_FAILED.to_string());
                self.events.emit(ViewEvent::ConversationsFailed {
                    message: LIST_FAILED.to_string(),
                });
            }
        }
        Apply::Applied
    }

    // ========================================================================
    // Active conversation
    // ========================================================================

    /// Load a conversation and make it active.
    ///
    /// On failure the previous session is left untouched.
    pub async fn load_conversation(
        &mut self,
        api: &dyn ApiBackend,
        id: ConversationId,
    ) -> Result<&[TranscriptEntry], ApiError> {
        let ticket = self.begin_load(id);
        let result = api.get_conversation(id).await;
        self.finish_load(ticket, result)?;
        Ok(self.session.transcript())
    }

    pub fn begin_load(&mut self, id: ConversationId) -> LoadTicket {
        self.last_load_token += 1;
        LoadTicket {
            token: self.last_load_token,
            id,
        }
    }

    /// Apply a load response. Errors of stale loads are dropped as well.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ConversationDetail, ApiError>,
    ) -> Result<Apply, ApiError> {
        if ticket.token != self.last_load_token {
            debug!(
                conversation_id = ticket.id,
                token = ticket.token,
                latest = self.last_load_token,
                "Discarding stale conversation load"
            );
            return Ok(Apply::Stale);
        }

        let detail = result.map_err(|e| {
            warn!(conversation_id = ticket.id, error = %e, "Failed to load conversation");
            e
        })?;

        let transcript = detail
            .messages
            .into_iter()
            .map(|mut message| {
                message.conversation_id.get_or_insert(ticket.id);
                TranscriptEntry::Message(message)
            })
            .collect();
        self.replace_session(Some(ticket.id), transcript);
        info!(conversation_id = ticket.id, "Conversation loaded");
        Ok(Apply::Applied)
    }

    /// Delete a conversation on the backend.
    ///
    /// On success the summary leaves the cached list, and if it was the active
    /// conversation the session resets to a new chat.
    pub async fn delete_conversation(
        &mut self,
        api: &dyn ApiBackend,
        id: ConversationId,
    ) -> Result<(), ApiError> {
        api.delete_conversation(id).await.map_err(|e| {
            warn!(conversation_id = id, error = %e, "Failed to delete conversation");
            e
        })?;

        self.conversations.retain(|c| c.id != id);
        self.events.emit(ViewEvent::ConversationsChanged);
        if self.session.current_conversation_id == Some(id) {
            self.start_new();
        }
        info!(conversation_id = id, "Conversation deleted");
        Ok(())
    }

    /// Show a new, unsaved conversation containing only the greeting.
    pub fn start_new(&mut self) {
        let greeting = greeting_entry(&self.greeting);
        self.replace_session(None, vec![greeting]);
    }

    fn replace_session(&mut self, id: Option<ConversationId>, transcript: Vec<TranscriptEntry>) {
        self.session.current_conversation_id = id;
        self.session.transcript = transcript;
        self.session.epoch += 1;
        self.events
            .emit(ViewEvent::TranscriptReplaced { conversation_id: id });
    }

    // ========================================================================
    // Primitives for the chat session controller
    // ========================================================================

    pub(crate) fn append(&mut self, entry: TranscriptEntry) {
        self.session.transcript.push(entry.clone());
        self.events.emit(ViewEvent::EntryAppended(entry));
    }

    pub(crate) fn remove_typing(&mut self) {
        let before = self.session.transcript.len();
        self.session
            .transcript
            .retain(|e| !matches!(e, TranscriptEntry::Typing));
        if self.session.transcript.len() != before {
            self.events.emit(ViewEvent::TypingStopped);
        }
    }

    pub(crate) fn set_pending(&mut self, pending: bool) {
        if self.session.pending_send != pending {
            self.session.pending_send = pending;
            self.events.emit(ViewEvent::PendingChanged { pending });
        }
    }

    /// Take the id the backend assigned to the active conversation.
    pub(crate) fn adopt(&mut self, id: ConversationId) {
        if self.session.current_conversation_id != Some(id) {
            self.session.current_conversation_id = Some(id);
            self.events.emit(ViewEvent::ConversationAdopted { id });
        }
    }
}

fn greeting_entry(greeting: &str) -> TranscriptEntry {
    TranscriptEntry::Message(Message::local(Sender::Bot, greeting))
}
