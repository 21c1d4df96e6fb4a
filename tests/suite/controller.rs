//! Result-screen flows over the real client: regenerate, export, preview.

use std::fs;

use pagesmith_engine::{
    EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME, GenerationMode, Phase, SANDBOX_PERMISSIONS, ViewMode,
};
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{
    FAST_PATH, TEST_KEY, app_for, gemini_body, mount_page, submit_prompt, wait_for_generation,
};

#[tokio::test]
async fn regenerate_replays_the_same_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&["<p>first</p>"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(FAST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&["<p>second</p>"])))
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "a landing page", GenerationMode::Fast);
    wait_for_generation(&mut app).await;
    assert_eq!(app.result().unwrap().page().html(), "<p>first</p>");

    app.regenerate();
    assert_eq!(app.phase(), Phase::Loading);
    wait_for_generation(&mut app).await;
    assert_eq!(app.result().unwrap().page().html(), "<p>second</p>");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].body, received[1].body);
    assert_eq!(
        app.last_request().unwrap().prompt().as_str(),
        "a landing page"
    );
}

#[tokio::test]
async fn failed_regenerate_keeps_the_previous_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&["<p>kept</p>"])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "a landing page", GenerationMode::Fast);
    wait_for_generation(&mut app).await;
    app.set_view_mode(ViewMode::Code);

    app.regenerate();
    wait_for_generation(&mut app).await;

    assert_eq!(app.phase(), Phase::Result);
    let result = app.result().unwrap();
    assert_eq!(result.page().html(), "<p>kept</p>");
    assert_eq!(result.view_mode(), ViewMode::Code);
    let detail = app.notice().unwrap().detail.clone().unwrap();
    assert!(detail.contains("503"), "{detail}");
    assert!(detail.contains("overloaded"), "{detail}");
}

#[tokio::test]
async fn export_writes_the_page_verbatim() {
    let html = "<!DOCTYPE html>\n<html><body>caf\u{e9} \u{2615}</body></html>\n";
    let server = MockServer::start().await;
    mount_page(&server, GenerationMode::Fast, html).await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "a cafe menu", GenerationMode::Fast);
    wait_for_generation(&mut app).await;

    let artifact = app.export_artifact().unwrap();
    assert_eq!(artifact.file_name, EXPORT_FILE_NAME);
    assert_eq!(artifact.content_type, EXPORT_CONTENT_TYPE);

    let written = app.export().unwrap();
    assert_eq!(written, dir.path().join("out").join("index.html"));
    // Cleanup trims the trailing newline before the page is stored.
    assert_eq!(fs::read(&written).unwrap(), html.trim().as_bytes());
    assert!(app.status_message().unwrap().starts_with("Exported"));
}

#[tokio::test]
async fn preview_host_embeds_the_page_in_a_sandbox() {
    let html = "<html><body><script>document.title=\"x\"</script></body></html>";
    let server = MockServer::start().await;
    mount_page(&server, GenerationMode::Fast, html).await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "x", GenerationMode::Fast);
    wait_for_generation(&mut app).await;
    app.open_preview();

    let host_path = app.result().unwrap().preview_path().unwrap().to_path_buf();
    let host = fs::read_to_string(host_path).unwrap();
    assert!(host.contains(&format!("sandbox=\"{}\"", SANDBOX_PERMISSIONS.join(" "))));
    assert!(host.contains("srcdoc=\"&lt;html&gt;"));
    assert!(host.contains("document.title=&quot;x&quot;"));
    assert!(!host.contains("<script>"));
    assert!(app.notice().is_none());
}

#[tokio::test]
async fn reset_returns_to_an_empty_landing() {
    let server = MockServer::start().await;
    mount_page(&server, GenerationMode::Thinking, "<p>x</p>").await;
    let dir = tempdir().unwrap();
    let mut app = app_for(&server, dir.path(), Some(TEST_KEY));

    submit_prompt(&mut app, "x", GenerationMode::Thinking);
    wait_for_generation(&mut app).await;
    app.reset();

    assert_eq!(app.phase(), Phase::Idle);
    assert!(app.result().is_none());
    assert!(app.last_request().is_none());
    assert_eq!(app.composer().draft().text(), "");
    assert_eq!(app.composer().mode(), GenerationMode::Thinking);
    assert!(app.export_artifact().is_none());
}
