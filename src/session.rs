//! Chat session controller
//!
//! Drives one chat pane: optimistic send, typing placeholder, reply display
//! with resource and emergency blocks, and reset. The same controller serves the
//! plain chat page and the page with a conversation sidebar; the difference is
//! expressed by [`ChatCapabilities`].

use crate::api::{ApiBackend, ApiError, ChatReply, ChatRequest, ConversationId, Message, Sender};
use crate::events::ViewEvent;
use crate::store::{ConversationStore, TranscriptEntry};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Local bot message appended when a send fails
pub const SEND_FAILED: &str = "Sorry, I encountered an error. Please try again.";

/// Notice shown when a reset fails
pub const RESET_FAILED: &str = "Failed to reset chat. Please try again.";

/// What the chat page around this controller can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChatCapabilities {
    /// A conversation sidebar is shown; it is refreshed after each reply
    pub sidebar: bool,
}

/// Why a send did not produce a reply
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SendError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("a message is already being sent")]
    Busy,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of a completed send
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub user: Message,
    /// `None` when the active conversation changed before the reply arrived
    pub reply: Option<Message>,
    pub conversation_id: Option<ConversationId>,
    pub showed_resources: bool,
    pub showed_emergency: bool,
}

/// A send between [`ChatSession::begin_send`] and [`ChatSession::finish_send`]
#[derive(Debug)]
#[must_use]
pub struct SendTicket {
    epoch: u64,
    user: Message,
    request: ChatRequest,
}

impl SendTicket {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Proof that the user confirmed a chat reset
#[derive(Debug)]
#[must_use]
pub struct ResetConfirmation(());

impl ResetConfirmation {
    pub const PROMPT: &'static str =
        "Are you sure you want to reset the chat? This will clear all conversation history.";
}

/// Releases the pending gate if the send future is dropped before the reply.
struct PendingGuard<'a> {
    session: &'a mut ChatSession,
    epoch: u64,
    armed: bool,
}

impl PendingGuard<'_> {
    fn complete(
        &mut self,
        ticket: SendTicket,
        result: Result<ChatReply, ApiError>,
    ) -> Result<SendOutcome, SendError> {
        self.armed = false;
        self.session.finish_send(ticket, result)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.session.abandon_send(self.epoch);
        }
    }
}

/// Controller of the chat pane.
pub struct ChatSession {
    store: ConversationStore,
    capabilities: ChatCapabilities,
    mood_preference: Option<String>,
}

impl ChatSession {
    pub fn new(store: ConversationStore, capabilities: ChatCapabilities) -> Self {
        Self {
            store,
            capabilities,
            mood_preference: None,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }

    pub fn capabilities(&self) -> ChatCapabilities {
        self.capabilities
    }

    /// Preferred video type passed along with every message
    pub fn set_mood_preference(&mut self, preference: Option<String>) {
        self.mood_preference = preference;
    }

    // ========================================================================
    // Send
    // ========================================================================

    /// Send a message and display the reply.
    ///
    /// The user message is shown before the request is issued. The pending gate
    /// is released whether the request succeeds, fails, or the returned future
    /// is dropped.
    pub async fn send(
        &mut self,
        api: &dyn ApiBackend,
        text: &str,
    ) -> Result<SendOutcome, SendError> {
        let ticket = self.begin_send(text)?;
        let request = ticket.request.clone();

        let mut guard = PendingGuard {
            epoch: ticket.epoch,
            session: self,
            armed: true,
        };
        let result = api.send_chat(&request).await;
        let outcome = guard.complete(ticket, result);
        drop(guard);

        if outcome.is_ok() && self.capabilities.sidebar {
            self.store.list_conversations(api).await;
        }
        outcome
    }

    /// Validate `text`, show it, and mark the session pending.
    pub fn begin_send(&mut self, text: &str) -> Result<SendTicket, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }
        if self.store.session().pending_send() {
            debug!("Send refused while a reply is pending");
            return Err(SendError::Busy);
        }

        let conversation_id = self.store.session().current_conversation_id();
        let user = Message::local(Sender::User, text).in_conversation(conversation_id);
        self.store.append(TranscriptEntry::Message(user.clone()));
        self.store.set_pending(true);
        self.store.append(TranscriptEntry::Typing);

        Ok(SendTicket {
            epoch: self.store.session().epoch(),
            user,
            request: ChatRequest {
                message: text.to_string(),
                conversation_id,
                mood_preference: self.mood_preference.clone(),
            },
        })
    }

    /// Apply the backend's answer to a send and release the pending gate.
    pub fn finish_send(
        &mut self,
        ticket: SendTicket,
        result: Result<ChatReply, ApiError>,
    ) -> Result<SendOutcome, SendError> {
        let outcome = if ticket.epoch != self.store.session().epoch() {
            debug!("Active conversation changed before the reply arrived; not displaying it");
            result
                .map(|reply| SendOutcome {
                    user: ticket.user,
                    reply: None,
                    conversation_id: reply.conversation_id,
                    showed_resources: false,
                    showed_emergency: false,
                })
                .map_err(SendError::from)
        } else {
            self.store.remove_typing();
            match result {
                Ok(reply) => Ok(self.show_reply(ticket.user, reply)),
                Err(e) => {
                    warn!(error = %e, "Chat request failed");
                    self.store
                        .append(TranscriptEntry::Message(Message::local(Sender::Bot, SEND_FAILED)));
                    Err(SendError::Api(e))
                }
            }
        };

        self.store.set_pending(false);
        outcome
    }

    fn abandon_send(&mut self, epoch: u64) {
        warn!("Send abandoned before the reply arrived");
        if epoch == self.store.session().epoch() {
            self.store.remove_typing();
        }
        self.store.set_pending(false);
    }

    fn show_reply(&mut self, user: Message, reply: ChatReply) -> SendOutcome {
        if let Some(id) = reply.conversation_id {
            self.store.adopt(id);
        }
        let conversation_id = self.store.session().current_conversation_id();

        let bot = Message::local(Sender::Bot, reply.message)
            .with_sentiment(reply.sentiment)
            .in_conversation(conversation_id);
        self.store.append(TranscriptEntry::Message(bot.clone()));

        let showed_resources = match reply.resources {
            Some(bundle) if reply.show_resources && !bundle.is_empty() => {
                self.store.append(TranscriptEntry::Resources(bundle));
                true
            }
            _ => false,
        };

        if reply.is_crisis {
            warn!(
                conversation_id = ?conversation_id,
                contacts = reply.emergency_resources.len(),
                "Backend flagged a crisis; showing emergency resources"
            );
            self.store
                .append(TranscriptEntry::Emergency(reply.emergency_resources));
        }

        info!(
            conversation_id = ?conversation_id,
            sentiment = ?bot.sentiment,
            resources = showed_resources,
            "Reply received"
        );

        SendOutcome {
            user,
            reply: Some(bot),
            conversation_id,
            showed_resources,
            showed_emergency: reply.is_crisis,
        }
    }

    // ========================================================================
    // New chat & reset
    // ========================================================================

    /// Switch to a new, unsaved conversation.
    pub fn new_chat(&mut self) {
        self.store.start_new();
    }

    /// First step of a reset; show [`ResetConfirmation::PROMPT`] before confirming.
    pub fn request_reset(&self) -> ResetConfirmation {
        ResetConfirmation(())
    }

    /// Drop the server-side dialogue state and start over.
    pub async fn reset(
        &mut self,
        api: &dyn ApiBackend,
        _confirmation: ResetConfirmation,
    ) -> Result<(), ApiError> {
        match api.reset_session().await {
            Ok(()) => {
                info!("Chat session reset");
                self.store.start_new();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to reset chat");
                self.store.events().emit(ViewEvent::Notice {
                    text: RESET_FAILED.to_string(),
                });
                Err(e)
            }
        }
    }
}
