//! Admin dashboard controller
//!
//! Stats, users and conversations are fetched concurrently and each table keeps
//! its own load state, so one failing endpoint does not blank the others.

use crate::api::{
    AdminConversation, AdminStats, AdminUser, ApiBackend, ApiError, ConversationDetail,
    ConversationId, UserId,
};
use crate::filter;
use crate::render::Renderer;
use thiserror::Error;
use tracing::{info, warn};

pub const STATS_FAILED: &str = "Error loading stats";
pub const USERS_FAILED: &str = "Error loading users";
pub const CONVERSATIONS_FAILED: &str = "Error loading conversations";
pub const DETAIL_FAILED: &str = "Error loading user details";
pub const VIEW_FAILED: &str = "Failed to load conversation";

/// Load state of one dashboard section
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Section<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Section::Loaded(value) => Some(value),
            _ => None,
        }
    }

    fn from_result(result: Result<T, ApiError>, failed: &str) -> Self {
        match result {
            Ok(value) => Section::Loaded(value),
            Err(e) => {
                warn!(error = %e, "{failed}");
                Section::Failed(failed.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdminTab {
    #[default]
    Users,
    Conversations,
    UserDetails,
}

/// One user with the conversations attributed to them
#[derive(Debug, Clone, PartialEq)]
pub struct UserDetail {
    pub user: AdminUser,
    pub conversations: Vec<AdminConversation>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    #[error("user {0} not found")]
    UserNotFound(UserId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Conversations belonging to `user`.
///
/// Rows carrying a `user_id` are matched on it; rows without one fall back to
/// the username.
pub fn conversations_for_user(
    user: &AdminUser,
    conversations: &[AdminConversation],
) -> Vec<AdminConversation> {
    conversations
        .iter()
        .filter(|c| match c.user_id {
            Some(id) => id == user.id,
            None => c.username == user.username,
        })
        .cloned()
        .collect()
}

pub struct AdminDashboard {
    renderer: Renderer,
    stats: Section<AdminStats>,
    users: Section<Vec<AdminUser>>,
    conversations: Section<Vec<AdminConversation>>,
    tab: AdminTab,
    users_filter: String,
    conversations_filter: String,
    selected_user_id: Option<UserId>,
    detail: Option<Section<UserDetail>>,
    viewer: Option<ConversationDetail>,
}

impl AdminDashboard {
    /// `renderer` formats the dates that take part in table filtering.
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            stats: Section::Loading,
            users: Section::Loading,
            conversations: Section::Loading,
            tab: AdminTab::default(),
            users_filter: String::new(),
            conversations_filter: String::new(),
            selected_user_id: None,
            detail: None,
            viewer: None,
        }
    }

    pub fn stats(&self) -> &Section<AdminStats> {
        &self.stats
    }

    pub fn users(&self) -> &Section<Vec<AdminUser>> {
        &self.users
    }

    pub fn conversations(&self) -> &Section<Vec<AdminConversation>> {
        &self.conversations
    }

    pub fn tab(&self) -> AdminTab {
        self.tab
    }

    pub fn switch_tab(&mut self, tab: AdminTab) {
        self.tab = tab;
    }

    pub fn selected_user_id(&self) -> Option<UserId> {
        self.selected_user_id
    }

    /// `None` until a user is selected
    pub fn detail(&self) -> Option<&Section<UserDetail>> {
        self.detail.as_ref()
    }

    /// The conversation open in the viewer, if any
    pub fn viewer(&self) -> Option<&ConversationDetail> {
        self.viewer.as_ref()
    }

    /// Fetch all three sections; each one settles independently.
    pub async fn load_dashboard(&mut self, api: &dyn ApiBackend) {
        self.stats = Section::Loading;
        self.users = Section::Loading;
        self.conversations = Section::Loading;

        let (stats, users, conversations) = tokio::join!(
            api.admin_stats(),
            api.admin_users(),
            api.admin_conversations()
        );
        self.stats = Section::from_result(stats, STATS_FAILED);
        self.users = Section::from_result(users, USERS_FAILED);
        self.conversations = Section::from_result(conversations, CONVERSATIONS_FAILED);
        info!(
            stats = self.stats.loaded().is_some(),
            users = self.users.loaded().map(Vec::len),
            conversations = self.conversations.loaded().map(Vec::len),
            "Admin dashboard loaded"
        );
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    pub fn set_users_filter(&mut self, term: impl Into<String>) {
        self.users_filter = term.into();
    }

    pub fn set_conversations_filter(&mut self, term: impl Into<String>) {
        self.conversations_filter = term.into();
    }

    /// Users whose rendered row contains the users filter
    pub fn visible_users(&self) -> Vec<&AdminUser> {
        let rows = self.users.loaded().map(Vec::as_slice).unwrap_or_default();
        filter::filter_rows(rows, &self.users_filter, |u| {
            self.renderer.user_cells(u).join(" ")
        })
    }

    /// Conversations whose rendered row contains the conversations filter
    pub fn visible_conversations(&self) -> Vec<&AdminConversation> {
        let rows = self
            .conversations
            .loaded()
            .map(Vec::as_slice)
            .unwrap_or_default();
        filter::filter_rows(rows, &self.conversations_filter, |c| {
            self.renderer.conversation_cells(c).join(" ")
        })
    }

    // ========================================================================
    // User details & viewer
    // ========================================================================

    /// Show one user's profile and conversations on the user-details tab.
    ///
    /// Both collections are refetched so the detail reflects the backend now.
    pub async fn load_user_details(
        &mut self,
        api: &dyn ApiBackend,
        user_id: UserId,
    ) -> Result<UserDetail, AdminError> {
        self.switch_tab(AdminTab::UserDetails);
        self.selected_user_id = Some(user_id);

        match Self::fetch_user_detail(api, user_id).await {
            Ok((detail, users, conversations)) => {
                self.users = Section::Loaded(users);
                self.conversations = Section::Loaded(conversations);
                self.detail = Some(Section::Loaded(detail.clone()));
                Ok(detail)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load user details");
                self.detail = Some(Section::Failed(DETAIL_FAILED.to_string()));
                Err(e)
            }
        }
    }

    async fn fetch_user_detail(
        api: &dyn ApiBackend,
        user_id: UserId,
    ) -> Result<(UserDetail, Vec<AdminUser>, Vec<AdminConversation>), AdminError> {
        let users = api.admin_users().await?;
        let conversations = api.admin_conversations().await?;
        let user = users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or(AdminError::UserNotFound(user_id))?;
        let detail = UserDetail {
            conversations: conversations_for_user(&user, &conversations),
            user,
        };
        Ok((detail, users, conversations))
    }

    /// Clear the user selection.
    pub fn clear_user_selection(&mut self) {
        self.selected_user_id = None;
        self.detail = None;
    }

    /// Open a conversation in the viewer. A failure leaves the viewer closed.
    pub async fn view_conversation(
        &mut self,
        api: &dyn ApiBackend,
        id: ConversationId,
    ) -> Result<&ConversationDetail, ApiError> {
        match api.get_conversation(id).await {
            Ok(detail) => Ok(self.viewer.insert(detail)),
            Err(e) => {
                warn!(conversation_id = id, error = %e, "{VIEW_FAILED}");
                self.viewer = None;
                Err(e)
            }
        }
    }

    pub fn close_viewer(&mut self) {
        self.viewer = None;
    }
}
