//! Pure render functions
//!
//! State in, view content out. Two targets are supported: [`Markup`] (HTML
//! fragments for a browser front end) and plain terminal text.
//!
//! `Markup` can only be built inside this module. Literal tags are `&'static
//! str`, and every runtime value goes through [`escape_markup`], so
//! server-supplied text can never inject markup.

use crate::admin::UserDetail;
use crate::api::{
    AdminConversation, AdminStats, AdminUser, ConversationDetail, ConversationSummary,
    EmergencyContact, Message, ResourceBundle, Sender,
};
use crate::format::{escape_markup, format_date, format_optional_date, format_time, sanitize_terminal};
use crate::sidebar::SidebarRow;
use crate::store::{ActiveSession, ListState, TranscriptEntry};
use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use std::fmt;

const USER_AVATAR: &str = "👤";
const BOT_AVATAR: &str = "🤖";
const BOT_NAME: &str = "MindMend";

pub const RESOURCES_HEADING: &str = "📚 Helpful Resources for You";
pub const EMERGENCY_HEADING: &str = "⚠️ Emergency Resources - Please Reach Out Now";
pub const NO_CONVERSATIONS: &str = "No conversations yet";

/// Escaped HTML fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup(String);

impl Markup {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn tag(&mut self, raw: &'static str) -> &mut Self {
        self.0.push_str(raw);
        self
    }

    fn text(&mut self, text: &str) -> &mut Self {
        self.0.push_str(&escape_markup(text));
        self
    }

    fn append(&mut self, other: Markup) -> &mut Self {
        self.0.push_str(&other.0);
        self
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Only http(s) links are rendered as-is.
fn link_target(url: &str) -> &str {
    let lower = url.trim_start().to_ascii_lowercase();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        url
    } else {
        "#"
    }
}

/// Text of a sidebar row, as displayed; used for local filtering.
pub fn summary_row_text(summary: &ConversationSummary) -> String {
    format!(
        "{} {} {} messages",
        summary.title, summary.preview, summary.message_count
    )
}

/// Renders view content with timestamps in one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    offset: FixedOffset,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::utc()
    }
}

impl Renderer {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// The machine's current local offset
    pub fn local() -> Self {
        Self::new(Local::now().offset().fix())
    }

    fn time(&self, ts: &DateTime<Utc>) -> String {
        format_time(&ts.with_timezone(&self.offset))
    }

    fn date(&self, ts: &DateTime<Utc>) -> String {
        format_date(&ts.with_timezone(&self.offset))
    }

    fn optional_date(&self, ts: Option<&DateTime<Utc>>) -> String {
        format_optional_date(ts.map(|t| t.with_timezone(&self.offset)).as_ref())
    }

    // ========================================================================
    // Chat transcript (markup)
    // ========================================================================

    pub fn transcript(&self, session: &ActiveSession) -> Markup {
        let mut out = Markup::default();
        for entry in session.transcript() {
            out.append(self.entry(entry));
        }
        out
    }

    pub fn entry(&self, entry: &TranscriptEntry) -> Markup {
        match entry {
            TranscriptEntry::Message(message) => self.message(message),
            TranscriptEntry::Resources(bundle) => self.resources(bundle),
            TranscriptEntry::Emergency(contacts) => self.emergency(contacts),
            TranscriptEntry::Typing => typing(),
        }
    }

    pub fn message(&self, message: &Message) -> Markup {
        let mut out = Markup::default();
        match message.sender {
            Sender::User => out.tag(r#"<div class="user-message"><div class="message-avatar">"#).text(USER_AVATAR),
            Sender::Bot => out.tag(r#"<div class="bot-message"><div class="message-avatar">"#).text(BOT_AVATAR),
        };
        out.tag(r#"</div><div class="message-content"><p>"#)
            .text(&message.content);
        if let Some(icon) = message.sentiment.as_ref().and_then(|s| s.icon()) {
            out.tag(" ").text(icon);
        }
        out.tag(r#"</p><span class="timestamp">"#)
            .text(&self.time(&message.timestamp))
            .tag("</span></div></div>");
        out
    }

    pub fn resources(&self, bundle: &ResourceBundle) -> Markup {
        let mut out = Markup::default();
        out.tag(r#"<div class="bot-message"><div class="message-avatar">"#)
            .text(BOT_AVATAR)
            .tag(r#"</div><div class="message-content resource-message"><h3>"#)
            .text(RESOURCES_HEADING)
            .tag("</h3>");

        if !bundle.videos.is_empty() {
            out.tag("<h4>").text("🎥 Helpful Videos").tag("</h4>");
            for video in &bundle.videos {
                out.tag(r#"<div class="resource-video"><a href=""#)
                    .text(link_target(&video.url))
                    .tag(r#"" target="_blank" rel="noopener">"#)
                    .text(&video.title)
                    .tag("</a><p>")
                    .text(&video.description)
                    .tag("</p><span>")
                    .text(&format!("{} • {}", video.duration, video.kind))
                    .tag("</span></div>");
            }
        }

        if !bundle.exercises.is_empty() {
            out.tag("<h4>").text("💪 Exercises to Try").tag("</h4>");
            for exercise in &bundle.exercises {
                out.tag(r#"<div class="resource-exercise"><strong>"#)
                    .text(&exercise.name)
                    .tag("</strong><p>")
                    .text(&exercise.description)
                    .tag("</p><span>")
                    .text(&format!("{} • {}", exercise.duration, exercise.benefit))
                    .tag("</span></div>");
            }
        }

        if !bundle.articles.is_empty() {
            out.tag("<h4>").text("📖 Helpful Articles").tag("</h4>");
            for article in &bundle.articles {
                out.tag(r#"<div class="resource-article"><a href=""#)
                    .text(link_target(&article.url))
                    .tag(r#"" target="_blank" rel="noopener">"#)
                    .text(&article.title)
                    .tag("</a><p>")
                    .text(&article.summary)
                    .tag("</p></div>");
            }
        }

        if !bundle.professional_resources.is_empty() {
            out.tag("<h4>").text("🏥 Professional Support").tag("</h4>");
            for resource in &bundle.professional_resources {
                out.tag(r#"<div class="resource-professional"><strong>"#)
                    .text(&resource.name)
                    .tag("</strong><p>")
                    .text(&resource.description)
                    .tag("</p>");
                if let Some(url) = &resource.url {
                    out.tag(r#"<a href=""#)
                        .text(link_target(url))
                        .tag(r#"" target="_blank" rel="noopener">Visit Website</a>"#);
                }
                if let Some(number) = &resource.number {
                    out.tag("<p>").text(&format!("📞 {number}")).tag("</p>");
                }
                out.tag("</div>");
            }
        }

        out.tag("</div></div>");
        out
    }

    pub fn emergency(&self, contacts: &[EmergencyContact]) -> Markup {
        let mut out = Markup::default();
        out.tag(r#"<div class="bot-message emergency"><div class="message-avatar">"#)
            .text(BOT_AVATAR)
            .tag(r#"</div><div class="message-content emergency-message"><h3>"#)
            .text(EMERGENCY_HEADING)
            .tag("</h3>");
        for contact in contacts {
            out.tag(r#"<div class="emergency-contact"><strong>"#)
                .text(&contact.service)
                .tag("</strong>");
            if let Some(number) = &contact.number {
                out.tag(r#"<p class="emergency-number">"#)
                    .text(&format!("📞 {number}"))
                    .tag("</p>");
            }
            if let Some(instruction) = &contact.instruction {
                out.tag("<p>").text(instruction).tag("</p>");
            }
            if let Some(available) = &contact.available {
                out.tag("<p>").text(&format!("Available: {available}")).tag("</p>");
            }
            out.tag("</div>");
        }
        out.tag("</div></div>");
        out
    }

    // ========================================================================
    // Sidebar (markup)
    // ========================================================================

    pub fn sidebar(&self, rows: &[SidebarRow<'_>], state: &ListState) -> Markup {
        let mut out = Markup::default();
        match state {
            ListState::Failed(message) => {
                out.tag(r#"<div class="no-conversations">"#).text(message).tag("</div>");
            }
            _ if rows.is_empty() => {
                out.tag(r#"<div class="no-conversations">"#)
                    .text(NO_CONVERSATIONS)
                    .tag("</div>");
            }
            _ => {
                for row in rows {
                    out.append(self.sidebar_row(row));
                }
            }
        }
        out
    }

    pub fn sidebar_row(&self, row: &SidebarRow<'_>) -> Markup {
        let summary = row.summary;
        let mut out = Markup::default();
        if row.active {
            out.tag(r#"<div class="conversation-item active" data-id=""#);
        } else {
            out.tag(r#"<div class="conversation-item" data-id=""#);
        }
        out.text(&summary.id.to_string())
            .tag(r#""><div class="conversation-title">"#)
            .text(&summary.title)
            .tag(r#"</div><div class="conversation-preview">"#)
            .text(&summary.preview)
            .tag(r#"</div><div class="conversation-meta">"#)
            .text(&format!("{} messages", summary.message_count))
            .tag("</div></div>");
        out
    }

    // ========================================================================
    // Admin (markup)
    // ========================================================================

    /// Cell texts of a users-table row, in column order
    pub fn user_cells(&self, user: &AdminUser) -> Vec<String> {
        vec![
            user.id.to_string(),
            user.username.clone(),
            user.email.clone(),
            if user.is_admin { "Admin" } else { "User" }.to_string(),
            self.date(&user.created_at),
            self.optional_date(user.last_login.as_ref()),
        ]
    }

    /// Cell texts of a conversations-table row, in column order
    pub fn conversation_cells(&self, conversation: &AdminConversation) -> Vec<String> {
        vec![
            conversation.id.to_string(),
            conversation.username.clone(),
            conversation.user_email.clone(),
            conversation.title.clone(),
            conversation.message_count.to_string(),
            self.date(&conversation.created_at),
            self.date(&conversation.updated_at),
        ]
    }

    pub fn table_rows(&self, rows: &[Vec<String>], empty: &str) -> Markup {
        let mut out = Markup::default();
        if rows.is_empty() {
            out.tag(r#"<tr><td class="no-data">"#).text(empty).tag("</td></tr>");
            return out;
        }
        for cells in rows {
            out.tag("<tr>");
            for cell in cells {
                out.tag("<td>").text(cell).tag("</td>");
            }
            out.tag("</tr>");
        }
        out
    }

    pub fn user_detail(&self, detail: &UserDetail) -> Markup {
        let user = &detail.user;
        let mut out = Markup::default();
        out.tag(r#"<div class="user-info-card"><h3>"#)
            .text("📋 User Information")
            .tag(r#"</h3><div class="user-info-grid">"#);
        let fields = [
            ("Username", user.username.clone()),
            ("Email", user.email.clone()),
            ("Registered", self.date(&user.created_at)),
            ("Last Login", self.optional_date(user.last_login.as_ref())),
            ("Total Conversations", detail.conversations.len().to_string()),
        ];
        for (label, value) in &fields {
            out.tag(r#"<div class="info-item"><div class="info-label">"#)
                .text(label)
                .tag(r#"</div><div class="info-value">"#)
                .text(value)
                .tag("</div></div>");
        }
        out.tag("</div></div><h3>")
            .text("💬 Conversation History")
            .tag(r#"</h3><div class="conversations-grid">"#);

        if detail.conversations.is_empty() {
            out.tag(r#"<p class="no-data">"#).text(NO_CONVERSATIONS).tag("</p>");
        }
        for conversation in &detail.conversations {
            out.tag(r#"<div class="conversation-card" data-id=""#)
                .text(&conversation.id.to_string())
                .tag(r#""><h4>"#)
                .text(&conversation.title)
                .tag(r#"</h4><div class="conversation-meta"><span>"#)
                .text(&format!("📅 {}", self.date(&conversation.created_at)))
                .tag("</span><span>")
                .text(&format!("💬 {} messages", conversation.message_count))
                .tag(r#"</span></div><div class="conversation-preview">"#)
                .text(
                    conversation
                        .preview
                        .as_deref()
                        .filter(|p| !p.is_empty())
                        .unwrap_or("No preview available"),
                )
                .tag("</div></div>");
        }
        out.tag("</div>");
        out
    }

    pub fn conversation_viewer(&self, detail: &ConversationDetail) -> Markup {
        let mut out = Markup::default();
        if detail.messages.is_empty() {
            out.tag(r#"<p class="no-data">"#)
                .text("No messages in this conversation")
                .tag("</p>");
            return out;
        }
        out.tag("<h3>").text(&detail.conversation.title).tag("</h3>");
        for message in &detail.messages {
            let sender = match message.sender {
                Sender::User => {
                    out.tag(r#"<div class="message-item message-user">"#);
                    "👤 User"
                }
                Sender::Bot => {
                    out.tag(r#"<div class="message-item message-bot">"#);
                    "🤖 Bot"
                }
            };
            out.tag(r#"<div class="message-header"><span class="message-sender">"#)
                .text(sender)
                .tag(r#"</span><span class="message-time">"#)
                .text(&self.date(&message.timestamp))
                .tag(r#"</span></div><div class="message-content">"#)
                .text(&message.content)
                .tag("</div>");
            if let Some(sentiment) = &message.sentiment {
                out.tag(r#"<div class="message-sentiment">"#)
                    .text(&format!("Sentiment: {}", sentiment.label()))
                    .tag("</div>");
            }
            out.tag("</div>");
        }
        out
    }

    // ========================================================================
    // Terminal text
    // ========================================================================

    pub fn entry_text(&self, entry: &TranscriptEntry) -> String {
        let text = match entry {
            TranscriptEntry::Message(message) => self.message_text(message),
            TranscriptEntry::Resources(bundle) => resources_text(bundle),
            TranscriptEntry::Emergency(contacts) => emergency_text(contacts),
            TranscriptEntry::Typing => format!("{BOT_NAME} is typing..."),
        };
        sanitize_terminal(&text)
    }

    fn message_text(&self, message: &Message) -> String {
        let who = match message.sender {
            Sender::User => "You",
            Sender::Bot => BOT_NAME,
        };
        let mut line = format!("[{}] {who}: {}", self.time(&message.timestamp), message.content);
        if let Some(icon) = message.sentiment.as_ref().and_then(|s| s.icon()) {
            line.push(' ');
            line.push_str(icon);
        }
        line
    }

    pub fn sidebar_text(&self, rows: &[SidebarRow<'_>], state: &ListState) -> String {
        if let ListState::Failed(message) = state {
            return sanitize_terminal(message);
        }
        if rows.is_empty() {
            return NO_CONVERSATIONS.to_string();
        }
        let lines: Vec<String> = rows
            .iter()
            .map(|row| {
                let marker = if row.active { '*' } else { ' ' };
                let s = row.summary;
                format!(
                    "{marker} {:>5}  {} ({} messages, {})\n         {}",
                    s.id,
                    s.title,
                    s.message_count,
                    self.date(&s.updated_at),
                    s.preview
                )
            })
            .collect();
        sanitize_terminal(&lines.join("\n"))
    }

    pub fn stats_text(&self, stats: &AdminStats) -> String {
        format!(
            "Total users:         {}\nTotal conversations: {}\nTotal messages:      {}",
            stats.total_users, stats.total_conversations, stats.total_messages
        )
    }

    pub fn user_detail_text(&self, detail: &UserDetail) -> String {
        let user = &detail.user;
        let mut lines = vec![
            format!("Username:            {}", user.username),
            format!("Email:               {}", user.email),
            format!("Registered:          {}", self.date(&user.created_at)),
            format!(
                "Last Login:          {}",
                self.optional_date(user.last_login.as_ref())
            ),
            format!("Total Conversations: {}", detail.conversations.len()),
            String::new(),
        ];
        if detail.conversations.is_empty() {
            lines.push(NO_CONVERSATIONS.to_string());
        }
        for c in &detail.conversations {
            lines.push(format!(
                "{:>5}  {} ({} messages, {})",
                c.id,
                c.title,
                c.message_count,
                self.date(&c.created_at)
            ));
        }
        sanitize_terminal(&lines.join("\n"))
    }

    pub fn conversation_text(&self, detail: &ConversationDetail) -> String {
        let mut lines = vec![format!("== {} ==", detail.conversation.title)];
        if detail.messages.is_empty() {
            lines.push("No messages in this conversation".to_string());
        }
        for message in &detail.messages {
            let mut line = format!(
                "[{}] {}: {}",
                self.date(&message.timestamp),
                match message.sender {
                    Sender::User => "User",
                    Sender::Bot => "Bot",
                },
                message.content
            );
            if let Some(sentiment) = &message.sentiment {
                line.push_str(&format!(" ({})", sentiment.label()));
            }
            lines.push(line);
        }
        sanitize_terminal(&lines.join("\n"))
    }
}

/// Left-aligned plain text table; `empty` replaces the body when there are no rows.
pub fn table_text(headers: &[&str], rows: &[Vec<String>], empty: &str) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for cells in rows {
        for (i, cell) in cells.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(headers.to_vec())];
    if rows.is_empty() {
        lines.push(empty.to_string());
    }
    for cells in rows {
        lines.push(line(cells.iter().map(String::as_str).collect()));
    }
    sanitize_terminal(&lines.join("\n"))
}

fn typing() -> Markup {
    let mut out = Markup::default();
    out.tag(r#"<div class="bot-message typing-message"><div class="message-avatar">"#)
        .text(BOT_AVATAR)
        .tag(r#"</div><div class="message-content"><div class="typing-indicator"><span></span><span></span><span></span></div></div></div>"#);
    out
}

fn resources_text(bundle: &ResourceBundle) -> String {
    let mut lines = vec![RESOURCES_HEADING.to_string()];
    if !bundle.videos.is_empty() {
        lines.push("  🎥 Helpful Videos".to_string());
        for v in &bundle.videos {
            lines.push(format!("    - {} ({} • {})", v.title, v.duration, v.kind));
            lines.push(format!("      {}", v.url));
        }
    }
    if !bundle.exercises.is_empty() {
        lines.push("  💪 Exercises to Try".to_string());
        for e in &bundle.exercises {
            lines.push(format!("    - {}: {}", e.name, e.description));
            lines.push(format!("      {} • {}", e.duration, e.benefit));
        }
    }
    if !bundle.articles.is_empty() {
        lines.push("  📖 Helpful Articles".to_string());
        for a in &bundle.articles {
            lines.push(format!("    - {}: {}", a.title, a.summary));
            lines.push(format!("      {}", a.url));
        }
    }
    if !bundle.professional_resources.is_empty() {
        lines.push("  🏥 Professional Support".to_string());
        for p in &bundle.professional_resources {
            lines.push(format!("    - {}: {}", p.name, p.description));
            if let Some(number) = &p.number {
                lines.push(format!("      📞 {number}"));
            }
            if let Some(url) = &p.url {
                lines.push(format!("      {url}"));
            }
        }
    }
    lines.join("\n")
}

fn emergency_text(contacts: &[EmergencyContact]) -> String {
    let mut lines = vec![EMERGENCY_HEADING.to_string()];
    for c in contacts {
        lines.push(format!("  {}", c.service));
        if let Some(number) = &c.number {
            lines.push(format!("    📞 {number}"));
        }
        if let Some(instruction) = &c.instruction {
            lines.push(format!("    {instruction}"));
        }
        if let Some(available) = &c.available {
            lines.push(format!("    Available: {available}"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Article, ConversationHeader, Sentiment, Video};
    use crate::events::EventBus;
    use crate::store::ConversationStore;
    use crate::test_helpers::{admin_conversation, admin_user, bot_message, crisis_reply, summary, user_message};

    #[test]
    fn test_message_text_is_escaped() {
        let r = Renderer::utc();
        let m = user_message("<script>alert('x')</script> & more", 1);
        let html = r.message(&m).into_string();
        assert!(html.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt; &amp; more"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"class="user-message""#));
        assert!(html.contains("14:07"));
    }

    #[test]
    fn test_sentiment_icon_follows_text() {
        let r = Renderer::utc();
        let html = r.message(&bot_message("ok", 1)).into_string();
        assert!(html.contains("<p>ok 😐</p>"));

        let mut m = bot_message("hmm", 1);
        m.sentiment = Some(Sentiment::Unknown);
        assert!(r.message(&m).as_str().contains("<p>hmm</p>"));
    }

    #[test]
    fn test_resource_fields_are_escaped() {
        let bundle = ResourceBundle {
            videos: vec![Video {
                title: "<b>Calm</b>".into(),
                url: "https://example.com/?a=1&b=\"2\"".into(),
                description: "d".into(),
                duration: "5 min".into(),
                kind: "calming".into(),
            }],
            articles: vec![Article {
                title: "Read".into(),
                url: "javascript:alert(1)".into(),
                summary: "s".into(),
            }],
            ..ResourceBundle::default()
        };
        let html = Renderer::utc().resources(&bundle).into_string();
        assert!(html.contains("&lt;b&gt;Calm&lt;/b&gt;"));
        assert!(html.contains("https://example.com/?a=1&amp;b=&quot;2&quot;"));
        assert!(!html.contains("javascript:"));
        assert!(html.contains(RESOURCES_HEADING));
        assert!(!html.contains("Exercises to Try"));
    }

    #[test]
    fn test_emergency_block_shows_service_and_number() {
        let contacts = crisis_reply().emergency_resources;
        let r = Renderer::utc();
        let html = r.emergency(&contacts).into_string();
        assert!(html.contains("Crisis Line"));
        assert!(html.contains("988"));

        let text = r.entry_text(&TranscriptEntry::Emergency(contacts));
        assert!(text.starts_with(EMERGENCY_HEADING));
        assert!(text.contains("Crisis Line"));
        assert!(text.contains("📞 988"));
    }

    #[test]
    fn test_terminal_text_strips_escape_sequences() {
        let r = Renderer::utc();
        let m = bot_message("\u{1b}[31mred\u{1b}[0m", 2);
        let text = r.entry_text(&TranscriptEntry::Message(m));
        assert_eq!(text, "[14:07] MindMend: [31mred[0m 😐");
    }

    #[test]
    fn test_offset_applies_to_times() {
        let r = Renderer::new(FixedOffset::east_opt(5 * 3600 + 1800).unwrap());
        let text = r.entry_text(&TranscriptEntry::Message(user_message("hi", 1)));
        assert_eq!(text, "[19:37] You: hi");
    }

    #[test]
    fn test_sidebar_row_markup() {
        let s = summary(3, "Tom & Jerry");
        let row = SidebarRow {
            summary: &s,
            active: true,
        };
        let html = Renderer::utc().sidebar_row(&row).into_string();
        assert!(html.starts_with(r#"<div class="conversation-item active" data-id="3">"#));
        assert!(html.contains("Tom &amp; Jerry"));
        assert_eq!(summary_row_text(&s), "Tom & Jerry Tom & Jerry preview 2 messages");
    }

    #[test]
    fn test_sidebar_failed_and_empty_states() {
        let r = Renderer::utc();
        let failed = ListState::Failed(crate::store::LIST_FAILED.into());
        assert!(r.sidebar(&[], &failed).as_str().contains("Failed to load conversations"));
        assert!(r.sidebar(&[], &ListState::Loaded).as_str().contains(NO_CONVERSATIONS));
    }

    #[test]
    fn test_admin_cells() {
        let r = Renderer::utc();
        let mut user = admin_user(4, "dana");
        user.is_admin = true;
        assert_eq!(
            r.user_cells(&user),
            vec!["4", "dana", "dana@example.com", "Admin", "05/03/2025, 02:07 pm", "Never"]
        );
        let conv = admin_conversation(8, Some(4), "dana", "Exams");
        assert_eq!(r.conversation_cells(&conv)[3], "Exams");
        assert!(r
            .table_rows(&[], "No users found")
            .as_str()
            .contains("No users found"));
    }

    #[test]
    fn test_table_text_pads_columns() {
        let rows = vec![
            vec!["1".to_string(), "alice".to_string()],
            vec!["12".to_string(), "bo".to_string()],
        ];
        assert_eq!(
            table_text(&["ID", "Username"], &rows, "No users found"),
            "ID  Username\n1   alice\n12  bo"
        );
        assert_eq!(
            table_text(&["ID"], &[], "No users found"),
            "ID\nNo users found"
        );
    }

    const HOSTILE: &str = r#"<b>x</b> "&'"#;
    const HOSTILE_ESCAPED: &str = "&lt;b&gt;x&lt;/b&gt; &quot;&amp;&#39;";

    fn hostile_detail() -> ConversationDetail {
        ConversationDetail {
            conversation: ConversationHeader {
                id: 4,
                title: HOSTILE.into(),
            },
            messages: vec![user_message(HOSTILE, 4), bot_message(HOSTILE, 4)],
        }
    }

    #[test]
    fn test_transcript_markup_escapes_loaded_messages() {
        let mut store = ConversationStore::new(HOSTILE, EventBus::default());
        let ticket = store.begin_load(4);
        store.finish_load(ticket, Ok(hostile_detail())).unwrap();

        let html = Renderer::utc().transcript(store.session()).into_string();
        assert_eq!(html.matches(HOSTILE_ESCAPED).count(), 2);
        assert!(!html.contains("<b>"));

        store.start_new();
        let html = Renderer::utc().transcript(store.session()).into_string();
        assert!(html.contains(HOSTILE_ESCAPED));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_user_detail_markup_escapes_server_text() {
        let mut user = admin_user(2, HOSTILE);
        user.email = HOSTILE.into();
        let mut conversation = admin_conversation(9, Some(2), HOSTILE, HOSTILE);
        conversation.preview = Some(HOSTILE.into());
        let detail = UserDetail {
            user,
            conversations: vec![conversation],
        };

        let html = Renderer::utc().user_detail(&detail).into_string();
        // username, email, title, preview
        assert_eq!(html.matches(HOSTILE_ESCAPED).count(), 4);
        assert!(!html.contains("<b>"));
        assert!(html.contains(r#"data-id="9""#));
        assert!(html.contains("Never"));
    }

    #[test]
    fn test_user_detail_without_conversations() {
        let detail = UserDetail {
            user: admin_user(3, "carol"),
            conversations: Vec::new(),
        };
        let html = Renderer::utc().user_detail(&detail).into_string();
        assert!(html.contains(NO_CONVERSATIONS));
        assert!(html.contains("carol@example.com"));
    }

    #[test]
    fn test_conversation_viewer_escapes_title_and_messages() {
        let html = Renderer::utc()
            .conversation_viewer(&hostile_detail())
            .into_string();
        assert_eq!(html.matches(HOSTILE_ESCAPED).count(), 3);
        assert!(!html.contains("<b>"));
        assert!(html.contains("Sentiment: neutral"));

        let empty = ConversationDetail {
            messages: Vec::new(),
            ..hostile_detail()
        };
        let html = Renderer::utc().conversation_viewer(&empty).into_string();
        assert!(html.contains("No messages in this conversation"));
        assert!(!html.contains(HOSTILE_ESCAPED));
    }
}
