//! Test data factories
//!
//! Provides convenience functions for creating wire objects with sensible
//! defaults and fixed timestamps, so equality assertions are stable.
#![allow(dead_code)]

use crate::api::*;
use crate::format::parse_timestamp;
use chrono::{DateTime, Utc};

/// Fixed reference time: 2025-03-05 14:07 UTC
pub fn ts() -> DateTime<Utc> {
    parse_timestamp("2025-03-05T14:07:00Z").expect("valid fixture timestamp")
}

pub fn summary(id: ConversationId, title: &str) -> ConversationSummary {
    ConversationSummary {
        id,
        title: title.to_string(),
        preview: format!("{title} preview"),
        message_count: 2,
        updated_at: ts(),
    }
}

pub fn user_message(content: &str, conversation_id: ConversationId) -> Message {
    Message {
        id: Some(conversation_id * 100),
        conversation_id: Some(conversation_id),
        sender: Sender::User,
        content: content.to_string(),
        sentiment: None,
        timestamp: ts(),
    }
}

pub fn bot_message(content: &str, conversation_id: ConversationId) -> Message {
    Message {
        id: Some(conversation_id * 100 + 1),
        conversation_id: Some(conversation_id),
        sender: Sender::Bot,
        content: content.to_string(),
        sentiment: Some(Sentiment::Neutral),
        timestamp: ts(),
    }
}

pub fn admin_user(id: UserId, username: &str) -> AdminUser {
    AdminUser {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        is_admin: false,
        created_at: ts(),
        last_login: None,
    }
}

pub fn admin_conversation(
    id: ConversationId,
    user_id: Option<UserId>,
    username: &str,
    title: &str,
) -> AdminConversation {
    AdminConversation {
        id,
        user_id,
        username: username.to_string(),
        user_email: format!("{username}@example.com"),
        title: title.to_string(),
        preview: None,
        message_count: 4,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn crisis_reply() -> ChatReply {
    ChatReply {
        message: "Your life matters. Please reach out now.".to_string(),
        sentiment: Some(Sentiment::Negative),
        is_crisis: true,
        emergency_resources: vec![EmergencyContact {
            service: "Crisis Line".to_string(),
            number: Some("988".to_string()),
            instruction: None,
            available: Some("24/7".to_string()),
        }],
        ..ChatReply::default()
    }
}

pub fn resource_reply() -> ChatReply {
    ChatReply {
        message: "Here are some things that might help.".to_string(),
        sentiment: Some(Sentiment::Negative),
        show_resources: true,
        resources: Some(ResourceBundle {
            videos: vec![Video {
                title: "Breathwork for Anxiety".to_string(),
                url: "https://www.youtube.com/watch?v=ci4Fpc8QFZw".to_string(),
                description: "Fast-acting breathing techniques".to_string(),
                duration: "6 min".to_string(),
                kind: "calming".to_string(),
            }],
            exercises: vec![Exercise {
                name: "Box breathing".to_string(),
                description: "Inhale 4, hold 4, exhale 4, hold 4".to_string(),
                duration: "4 min".to_string(),
                benefit: "Calms the nervous system".to_string(),
            }],
            ..ResourceBundle::default()
        }),
        ..ChatReply::default()
    }
}
