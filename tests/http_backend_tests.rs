//! HttpBackend integration tests
//!
//! Each test runs against an in-process wiremock server, so no backend needs
//! to be running.
//! Run with: cargo test --test http_backend_tests

use mindmend_client::api::{
    ApiBackend, ApiError, ChatRequest, HttpBackend, LoginRequest, Sender, Sentiment,
    SignupRequest, CONNECTION_ERROR,
};
use mindmend_client::events::EventBus;
use mindmend_client::session::{ChatCapabilities, ChatSession};
use mindmend_client::store::{ConversationStore, TranscriptEntry, DEFAULT_GREETING};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(server.uri(), Duration::from_secs(5)).unwrap()
}

fn chat_request(message: &str, conversation_id: Option<i64>) -> ChatRequest {
    ChatRequest {
        message: message.into(),
        conversation_id,
        mood_preference: None,
    }
}

#[tokio::test]
async fn test_send_chat_posts_message_without_conversation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "message": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Hi! How are you feeling?",
            "sentiment": "neutral",
            "intensity": 0.1,
            "conversation_id": 42,
            "show_resources": false,
            "is_crisis": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = backend(&server)
        .send_chat(&chat_request("hello", None))
        .await
        .unwrap();
    assert_eq!(reply.conversation_id, Some(42));
    assert_eq!(reply.sentiment, Some(Sentiment::Neutral));
    assert!(reply.resources.is_none());
}

#[tokio::test]
async fn test_chat_reply_with_resources_and_crisis() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Please reach out now.",
            "sentiment": "negative",
            "conversation_id": 3,
            "show_resources": true,
            "resources": {
                "videos": [{
                    "title": "Calm breathing",
                    "url": "https://www.youtube.com/watch?v=abc",
                    "description": "Slow down",
                    "duration": "5 min",
                    "type": "calming"
                }],
                "exercises": [],
                "articles": [],
                "professional_resources": [{ "name": "Therapist finder", "description": "Find help", "number": "555-0100" }]
            },
            "is_crisis": true,
            "emergency_resources": [
                { "service": "Crisis Line", "number": "988", "available": "24/7" },
                { "service": "Emergency", "instruction": "Go to the nearest emergency room" }
            ]
        })))
        .mount(&server)
        .await;

    let reply = backend(&server)
        .send_chat(&chat_request("I feel hopeless", Some(3)))
        .await
        .unwrap();
    let resources = reply.resources.unwrap();
    assert_eq!(resources.videos[0].kind, "calming");
    assert_eq!(
        resources.professional_resources[0].number.as_deref(),
        Some("555-0100")
    );
    assert!(reply.is_crisis);
    assert_eq!(reply.emergency_resources.len(), 2);
    assert_eq!(reply.emergency_resources[1].number, None);
}

#[tokio::test]
async fn test_list_and_get_conversations() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                { "id": 9, "title": "Newest", "preview": "p", "message_count": 4, "updated_at": "2025-03-05T14:07:00" },
                { "id": 2, "title": "Older", "preview": "", "message_count": 2, "updated_at": "2025-03-01T09:00:00.123456" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation": { "id": 9, "title": "Newest" },
            "messages": [
                { "id": 1, "sender": "user", "content": "hi", "sentiment": null, "timestamp": "2025-03-05T14:06:00" },
                { "id": 2, "sender": "bot", "content": "hello", "sentiment": "positive", "timestamp": "2025-03-05T14:07:00" }
            ]
        })))
        .mount(&server)
        .await;

    let api = backend(&server);
    let list = api.list_conversations().await.unwrap();
    let ids: Vec<_> = list.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![9, 2]);

    let detail = api.get_conversation(9).await.unwrap();
    assert_eq!(detail.conversation.title, "Newest");
    assert_eq!(detail.messages[0].sender, Sender::User);
    assert_eq!(detail.messages[1].sentiment, Some(Sentiment::Positive));
}

#[tokio::test]
async fn test_application_error_text_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/conversations/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error": "Conversation not found" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/conversations/5"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
        .mount(&server)
        .await;

    let api = backend(&server);
    let err = api.get_conversation(404).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Application {
            status: 404,
            message: Some("Conversation not found".into())
        }
    );
    assert_eq!(err.user_message("fallback"), "Conversation not found");

    let err = api.delete_conversation(5).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Application {
            status: 500,
            message: None
        }
    );
    assert_eq!(err.user_message("Delete failed"), "Delete failed");
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totals": 3 })))
        .mount(&server)
        .await;

    let err = backend(&server).admin_stats().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let api = HttpBackend::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
    let err = api.list_conversations().await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.user_message("ignored"), CONNECTION_ERROR);
}

#[tokio::test]
async fn test_login_cookie_is_sent_on_later_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "alex", "password": "secret1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_json(json!({ "message": "Login successful" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/conversations"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "conversations": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let api = backend(&server);
    api.login(&LoginRequest {
        username: "alex".into(),
        password: "secret1".into(),
    })
    .await
    .unwrap();
    assert!(api.list_conversations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_signup_logout_and_reset_paths() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/signup"))
        .and(body_json(json!({
            "username": "alex",
            "email": "alex@example.com",
            "password": "secret1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "created" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Session reset" })))
        .expect(1)
        .mount(&server)
        .await;

    let api = backend(&server);
    api.signup(&SignupRequest {
        username: "alex".into(),
        email: "alex@example.com".into(),
        password: "secret1".into(),
    })
    .await
    .unwrap();
    api.logout().await.unwrap();
    api.reset_session().await.unwrap();
}

#[tokio::test]
async fn test_admin_endpoints_unwrap_envelopes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "stats": { "total_users": 2, "total_conversations": 3, "total_messages": 17 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                { "id": 1, "username": "root", "email": "root@example.com", "is_admin": true,
                  "created_at": "2025-01-01T00:00:00", "last_login": "2025-03-05T14:07:00" },
                { "id": 2, "username": "sam", "email": "sam@example.com", "is_admin": false,
                  "created_at": "2025-02-01T00:00:00", "last_login": null }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/admin/conversations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversations": [
                { "id": 7, "username": "sam", "user_email": "sam@example.com", "title": "Exams",
                  "message_count": 6, "created_at": "2025-02-02T10:00:00", "updated_at": "2025-02-02T11:00:00" }
            ]
        })))
        .mount(&server)
        .await;

    let api = backend(&server);
    assert_eq!(api.admin_stats().await.unwrap().total_messages, 17);

    let users = api.admin_users().await.unwrap();
    assert!(users[0].is_admin);
    assert!(users[0].last_login.is_some());
    assert!(users[1].last_login.is_none());

    let conversations = api.admin_conversations().await.unwrap();
    assert_eq!(conversations[0].user_id, None);
    assert_eq!(conversations[0].username, "sam");
}

#[tokio::test]
async fn test_session_adopts_id_for_follow_up_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "message": "first" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Tell me more.",
            "sentiment": "neutral",
            "conversation_id": 42
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_json(json!({ "message": "second", "conversation_id": 42 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "I understand.",
            "sentiment": "neutral",
            "conversation_id": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = backend(&server);
    let mut chat = ChatSession::new(
        ConversationStore::new(DEFAULT_GREETING, EventBus::default()),
        ChatCapabilities::default(),
    );
    chat.send(&api, "first").await.unwrap();
    chat.send(&api, "second").await.unwrap();

    let session = chat.store().session();
    assert_eq!(session.current_conversation_id(), Some(42));
    let contents: Vec<_> = session.messages().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![DEFAULT_GREETING, "first", "Tell me more.", "second", "I understand."]
    );
    assert!(!session
        .transcript()
        .iter()
        .any(|e| matches!(e, TranscriptEntry::Typing)));
}
