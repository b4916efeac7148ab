//! View event types

use crate::api::ConversationId;
use crate::store::TranscriptEntry;

/// A view-model transition, emitted after the state has changed.
///
/// Each variant names the view region that needs re-rendering.
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The cached conversation list was replaced
    ConversationsChanged,
    /// The conversation list could not be loaded
    ConversationsFailed { message: String },
    /// The transcript was replaced wholesale (load, new chat, reset)
    TranscriptReplaced {
        conversation_id: Option<ConversationId>,
    },
    /// One entry was appended at the end of the transcript
    EntryAppended(TranscriptEntry),
    /// The typing placeholder was removed
    TypingStopped,
    /// The server assigned an id to the new conversation
    ConversationAdopted { id: ConversationId },
    /// The send control must be disabled (`true`) or re-enabled
    PendingChanged { pending: bool },
    /// The sidebar overlay opened or closed
    SidebarChanged { open: bool },
    /// A user-facing message (errors, confirmations)
    Notice { text: String },
}

impl ViewEvent {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ViewEvent::ConversationsChanged => "conversations_changed",
            ViewEvent::ConversationsFailed { .. } => "conversations_failed",
            ViewEvent::TranscriptReplaced { .. } => "transcript_replaced",
            ViewEvent::EntryAppended(_) => "entry_appended",
            ViewEvent::TypingStopped => "typing_stopped",
            ViewEvent::ConversationAdopted { .. } => "conversation_adopted",
            ViewEvent::PendingChanged { .. } => "pending_changed",
            ViewEvent::SidebarChanged { .. } => "sidebar_changed",
            ViewEvent::Notice { .. } => "notice",
        }
    }
}
