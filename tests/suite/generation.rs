//! End-to-end generation against a mock Gemini backend.

use pagesmith_engine::{GENERATION_FAILED_TITLE, GenerationMode, Phase};
use pagesmith_providers::MAX_THINKING_BUDGET;
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    FAST_PATH, TEST_KEY, THINKING_PATH, app_for, gemini_body, mount_error, mount_page,
    submit_prompt, wait_for_generation,
};

const POMODORO: &str = "<!DOCTYPE html><html><head><title>Pomodoro</title></head>\
<body><div id=\"t\">25:00</div><script>let s=1500;</script></body></html>";

#[tokio::test]
async fn fast_prompt_produces_a_page() {
    let server = MockServer::start().await;
    mount_page(&server, GenerationMode::Fast, POMODORO).await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "a pomodoro timer", GenerationMode::Fast);
    assert_eq!(app.phase(), Phase::Loading);
    wait_for_generation(&mut app).await;

    assert_eq!(app.phase(), Phase::Result);
    let page = app.result().unwrap().page();
    assert_eq!(page.html(), POMODORO);
    assert_eq!(page.title(), Some("Pomodoro"));
    let host = std::fs::read_to_string(app.result().unwrap().preview_path().unwrap()).unwrap();
    assert!(host.contains("srcdoc=\"&lt;!DOCTYPE html&gt;"));
    assert!(app.notice().is_none());
    assert_eq!(app.composer().draft().text(), "");
    assert_eq!(app.composer().mode(), GenerationMode::Fast);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let sent: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(sent["contents"][0]["parts"][0]["text"], "a pomodoro timer");
    assert!(sent["system_instruction"]["parts"][0]["text"].is_string());
    assert!(sent.get("generationConfig").is_none());
}

#[tokio::test]
async fn thinking_prompt_uses_pro_model_with_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(THINKING_PATH))
        .and(header("x-goog-api-key", TEST_KEY))
        .and(body_partial_json(json!({
            "generationConfig": { "thinkingConfig": { "thinkingBudget": MAX_THINKING_BUDGET } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&["<p>board</p>"])))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "a chess board", GenerationMode::Thinking);
    wait_for_generation(&mut app).await;

    assert_eq!(app.result().unwrap().page().html(), "<p>board</p>");
    assert_eq!(app.composer().mode(), GenerationMode::Thinking);
}

#[tokio::test]
async fn fenced_answer_is_cleaned() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        GenerationMode::Fast,
        "```html\n<!DOCTYPE html><html><body>hi</body></html>\n```",
    )
    .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "hello page", GenerationMode::Fast);
    wait_for_generation(&mut app).await;

    assert_eq!(
        app.result().unwrap().page().html(),
        "<!DOCTYPE html><html><body>hi</body></html>"
    );
}

#[tokio::test]
async fn thought_parts_are_not_part_of_the_page() {
    let server = MockServer::start().await;
    let body = json!({
        "candidates": [{
            "content": { "parts": [
                { "text": "planning the layout", "thought": true },
                { "text": "<html>" },
                { "text": "</html>" }
            ]}
        }]
    });
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "x", GenerationMode::Fast);
    wait_for_generation(&mut app).await;

    assert_eq!(app.result().unwrap().page().html(), "<html></html>");
}

#[tokio::test]
async fn missing_credential_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), None);

    submit_prompt(&mut app, "a pomodoro timer", GenerationMode::Fast);

    assert_eq!(app.phase(), Phase::Idle);
    let notice = app.notice().unwrap();
    assert_eq!(notice.title, GENERATION_FAILED_TITLE);
    assert!(notice.detail.as_deref().unwrap().contains("API key"));
    assert_eq!(app.composer().draft().text(), "a pomodoro timer");
}

#[tokio::test]
async fn rate_limit_surfaces_backend_message() {
    let server = MockServer::start().await;
    mount_error(&server, 429, "Resource has been exhausted (e.g. check quota).").await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "a pomodoro timer", GenerationMode::Fast);
    wait_for_generation(&mut app).await;

    assert_eq!(app.phase(), Phase::Idle);
    let notice = app.notice().unwrap();
    assert_eq!(notice.title, GENERATION_FAILED_TITLE);
    let detail = notice.detail.as_deref().unwrap();
    assert!(detail.contains("429"), "{detail}");
    assert!(detail.contains("Resource has been exhausted"), "{detail}");
    assert_eq!(app.composer().draft().text(), "a pomodoro timer");
}

#[tokio::test]
async fn hostile_error_text_is_sanitized() {
    let server = MockServer::start().await;
    mount_error(&server, 500, "boom\u{1b}]52;c;Zm9v\u{7}\u{1b}[2J").await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "x", GenerationMode::Fast);
    wait_for_generation(&mut app).await;

    let detail = app.notice().unwrap().detail.clone().unwrap();
    assert!(detail.contains("boom"));
    assert!(!detail.chars().any(|c| c == '\u{1b}' || c == '\u{7}'));
}

#[tokio::test]
async fn blocked_prompt_is_reported_as_empty_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "x", GenerationMode::Fast);
    wait_for_generation(&mut app).await;

    assert_eq!(app.phase(), Phase::Idle);
    let detail = app.notice().unwrap().detail.clone().unwrap();
    assert!(detail.contains("No code generated"), "{detail}");
    assert!(detail.contains("SAFETY"), "{detail}");
}
