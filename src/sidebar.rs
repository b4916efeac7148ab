//! Conversation sidebar controller
//!
//! Presents the cached conversation list, drives selection and confirmed
//! deletion through the chat session, and keeps the responsive open/closed
//! state. Filtering is local and never reaches the backend.

use crate::api::{ApiBackend, ApiError, ConversationId, ConversationSummary};
use crate::events::{EventBus, ViewEvent};
use crate::filter;
use crate::render;
use crate::session::ChatSession;
use crate::store::ConversationStore;
use tracing::{debug, info};

/// Viewports narrower than this (in CSS pixels) show the sidebar as an overlay
pub const DEFAULT_NARROW_WIDTH: u32 = 768;

/// Presentation state of the sidebar; never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub sidebar_open: bool,
    pub narrow_viewport: bool,
    pub search_term: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            sidebar_open: true,
            narrow_viewport: false,
            search_term: String::new(),
        }
    }
}

/// One visible row of the sidebar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SidebarRow<'a> {
    pub summary: &'a ConversationSummary,
    /// The row is the conversation shown in the chat pane
    pub active: bool,
}

/// Proof that the user confirmed deleting one conversation
#[derive(Debug)]
#[must_use]
pub struct DeleteConfirmation {
    id: ConversationId,
}

impl DeleteConfirmation {
    pub const PROMPT: &'static str = "Are you sure you want to delete this conversation?";

    pub fn conversation_id(&self) -> ConversationId {
        self.id
    }
}

pub struct SidebarController {
    ui: UiState,
    narrow_breakpoint: u32,
    events: EventBus,
}

impl SidebarController {
    pub fn new(narrow_breakpoint: u32, events: EventBus) -> Self {
        Self {
            ui: UiState::default(),
            narrow_breakpoint,
            events,
        }
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Rows in server order, minus those hidden by the search term.
    pub fn rows<'a>(&self, store: &'a ConversationStore) -> Vec<SidebarRow<'a>> {
        let active = store.session().current_conversation_id();
        filter::filter_rows(store.conversations(), &self.ui.search_term, |s| {
            render::summary_row_text(s)
        })
        .into_iter()
        .map(|summary| SidebarRow {
            summary,
            active: active == Some(summary.id),
        })
        .collect()
    }

    /// Make `id` the active conversation.
    ///
    /// On a narrow viewport the overlay closes once the conversation is shown.
    pub async fn select(
        &mut self,
        session: &mut ChatSession,
        api: &dyn ApiBackend,
        id: ConversationId,
    ) -> Result<(), ApiError> {
        session.store_mut().load_conversation(api, id).await?;
        if self.ui.narrow_viewport {
            self.close();
        }
        Ok(())
    }

    /// First step of a deletion; show [`DeleteConfirmation::PROMPT`] before confirming.
    pub fn request_delete(&self, id: ConversationId) -> DeleteConfirmation {
        DeleteConfirmation { id }
    }

    /// Delete the confirmed conversation, then reload the list from the backend.
    pub async fn confirm_delete(
        &mut self,
        session: &mut ChatSession,
        api: &dyn ApiBackend,
        confirmation: DeleteConfirmation,
    ) -> Result<(), ApiError> {
        let store = session.store_mut();
        store.delete_conversation(api, confirmation.id).await?;
        store.list_conversations(api).await;
        Ok(())
    }

    // ========================================================================
    // Open/close
    // ========================================================================

    pub fn toggle(&mut self) {
        self.set_open(!self.ui.sidebar_open);
    }

    pub fn open(&mut self) {
        self.set_open(true);
    }

    pub fn close(&mut self) {
        self.set_open(false);
    }

    fn set_open(&mut self, open: bool) {
        if self.ui.sidebar_open != open {
            self.ui.sidebar_open = open;
            self.events.emit(ViewEvent::SidebarChanged { open });
        }
    }

    /// Entering narrow mode hides the overlay; leaving it shows the sidebar again.
    pub fn set_viewport_width(&mut self, width: u32) {
        let narrow = width < self.narrow_breakpoint;
        if narrow == self.ui.narrow_viewport {
            return;
        }
        debug!(width, narrow, "Viewport mode changed");
        self.ui.narrow_viewport = narrow;
        self.set_open(!narrow);
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.ui.search_term = term.into();
        info!(term = %self.ui.search_term, "Sidebar filter changed");
    }
}
