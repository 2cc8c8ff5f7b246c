//! Integration test: serve a mock chat-completions endpoint on a free port and drive the real
//! OpenRouter client (and a session) against it. No network access beyond loopback.

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Router};
use learner_lib::conversation::Role;
use learner_lib::llm::{ChatBackend, ChatMessage, OpenRouterClient, MISSING_CREDENTIAL_REPLY};
use learner_lib::session::LearnerSession;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct MockEndpoint {
    status: StatusCode,
    body: String,
    hits: AtomicUsize,
    last_request: Mutex<Option<(Option<String>, serde_json::Value)>>,
}

async fn completions(
    State(mock): State<Arc<MockEndpoint>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    mock.hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let json = serde_json::from_str(&body).unwrap_or(serde_json::Value::Null);
    *mock.last_request.lock().expect("lock") = Some((auth, json));
    (mock.status, mock.body.clone())
}

/// Start the mock and return it with the endpoint URL.
async fn serve(status: StatusCode, body: &str) -> (Arc<MockEndpoint>, String) {
    let mock = Arc::new(MockEndpoint {
        status,
        body: body.to_string(),
        hits: AtomicUsize::new(0),
        last_request: Mutex::new(None),
    });
    let app = Router::new()
        .route("/api/v1/chat/completions", post(completions))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (mock, format!("http://{}/api/v1/chat/completions", addr))
}

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind free port");
    listener.local_addr().expect("local_addr").port()
}

fn transcript() -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::User, "What is a noun?"),
        ChatMessage::new(Role::Assistant, "A naming word."),
        ChatMessage::new(Role::User, "Give an example."),
    ]
}

#[tokio::test]
async fn missing_credential_sends_nothing() {
    let (mock, url) = serve(StatusCode::OK, "{}").await;
    let client = OpenRouterClient::new(url, "test/model");

    assert_eq!(client.complete("", &transcript()).await, MISSING_CREDENTIAL_REPLY);
    assert_eq!(client.complete("  \t", &transcript()).await, MISSING_CREDENTIAL_REPLY);
    assert_eq!(mock.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn success_returns_first_choice_content_unchanged() {
    let reply = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Dog is a noun.\n"}},{"message":{"content":"ignored"}}]}"#;
    let (mock, url) = serve(StatusCode::OK, reply).await;
    let client = OpenRouterClient::new(url, "test/model");

    let out = client.complete(" sk-test ", &transcript()).await;
    assert_eq!(out, "  Dog is a noun.\n");
    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);

    let (auth, body) = mock.last_request.lock().unwrap().clone().expect("request");
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "test/model");
    let messages = body["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[2]["content"], "Give an example.");
}

#[tokio::test]
async fn server_error_reply_has_status_and_body() {
    let (_mock, url) = serve(StatusCode::INTERNAL_SERVER_ERROR, "server error").await;
    let client = OpenRouterClient::new(url, "test/model");

    let out = client.complete("sk-test", &transcript()).await;
    assert!(out.contains("500"), "{}", out);
    assert!(out.contains("server error"), "{}", out);
    assert_eq!(out, "Error: 500 - server error");
}

#[tokio::test]
async fn non_200_success_status_is_still_an_error() {
    let (_mock, url) = serve(StatusCode::CREATED, r#"{"choices":[]}"#).await;
    let client = OpenRouterClient::new(url, "test/model");

    let out = client.complete("sk-test", &transcript()).await;
    assert!(out.starts_with("Error: 201 - "), "{}", out);
}

#[tokio::test]
async fn malformed_json_reply_carries_traceback() {
    let (_mock, url) = serve(StatusCode::OK, "<html>gateway timeout</html>").await;
    let client = OpenRouterClient::new(url, "test/model").with_backtrace(false);

    let out = client.complete("sk-test", &transcript()).await;
    assert!(out.starts_with("Error: "), "{}", out);
    assert!(out.contains("\nTraceback:\n"), "{}", out);
}

#[tokio::test]
async fn missing_choices_is_reported() {
    let (_mock, url) = serve(StatusCode::OK, r#"{"choices":[]}"#).await;
    let client = OpenRouterClient::new(url, "test/model").with_backtrace(false);

    let out = client.complete("sk-test", &transcript()).await;
    assert!(out.contains("choices[0].message.content"), "{}", out);
    assert!(out.contains("Traceback:"), "{}", out);
}

#[tokio::test]
async fn connection_failure_is_reported_as_text() {
    let url = format!("http://127.0.0.1:{}/api/v1/chat/completions", free_port());
    let client = OpenRouterClient::new(url, "test/model").with_backtrace(false);

    let out = client.complete("sk-test", &transcript()).await;
    assert!(out.starts_with("Error: openrouter request failed"), "{}", out);
    assert!(out.contains("Traceback:"), "{}", out);
}

#[tokio::test]
async fn session_stores_error_reply_as_assistant_turn() {
    let (mock, url) = serve(StatusCode::INTERNAL_SERVER_ERROR, "server error").await;
    let client = OpenRouterClient::new(url, "test/model");
    let mut session = LearnerSession::default();

    session.set_input("Explain photosynthesis");
    assert!(session.submit(&client).await);
    let turns = session.conversation().all();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role(), Role::Assistant);
    assert_eq!(turns[1].content(), MISSING_CREDENTIAL_REPLY);
    assert_eq!(mock.hits.load(Ordering::SeqCst), 0);

    session.set_credential("sk-test");
    session.set_input("Explain photosynthesis");
    assert!(session.submit(&client).await);
    let turns = session.conversation().all();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[3].content(), "Error: 500 - server error");
    assert_eq!(mock.hits.load(Ordering::SeqCst), 1);
}
