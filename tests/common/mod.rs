//! Shared test utilities and fixtures
//!
//! A mock Gemini backend plus an [`App`] wired to it.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pagesmith_engine::{
    ApiKey, App, AppSettings, CredentialSource, GeminiClient, GenerationMode, UiOptions,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_KEY: &str = "test-key";

pub const FAST_PATH: &str = "/models/gemini-3-flash-preview:generateContent";
pub const THINKING_PATH: &str = "/models/gemini-3-pro-preview:generateContent";

pub fn model_path(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Fast => FAST_PATH,
        GenerationMode::Thinking => THINKING_PATH,
    }
}

/// A generateContent body whose first candidate carries `parts` as text.
pub fn gemini_body(parts: &[&str]) -> serde_json::Value {
    let parts: Vec<_> = parts
        .iter()
        .map(|text| serde_json::json!({ "text": text }))
        .collect();
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": parts },
            "finishReason": "STOP"
        }]
    })
}

/// Mount a successful answer for `mode`, keyed on the test credential.
pub async fn mount_page(server: &MockServer, mode: GenerationMode, html: &str) {
    Mock::given(method("POST"))
        .and(path(model_path(mode)))
        .and(header("x-goog-api-key", TEST_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&[html])))
        .mount(server)
        .await;
}

/// Mount a Google-style error envelope.
pub async fn mount_error(server: &MockServer, status: u16, message: &str) {
    let body = serde_json::json!({
        "error": { "code": status, "message": message, "status": "ERROR" }
    });
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub fn settings(dir: &Path, key: Option<&str>) -> AppSettings {
    AppSettings {
        credentials: CredentialSource::Fixed(key.map(|k| ApiKey::new(k).unwrap())),
        export_dir: dir.join("out"),
        preview_dir: dir.join("preview"),
        ui_options: UiOptions::default(),
    }
}

/// Production client pointed at the mock server.
pub fn app_for(server: &MockServer, dir: &Path, key: Option<&str>) -> App {
    let client = GeminiClient::with_base_url(server.uri()).unwrap();
    App::new(Arc::new(client), settings(dir, key)).with_browser_launcher(|_| Ok(()))
}

pub fn submit_prompt(app: &mut App, prompt: &str, mode: GenerationMode) {
    let composer = app
        .composer_mut()
        .expect("composer is editable on the landing screen");
    composer.set_mode(mode);
    composer.draft_mut().enter_text(prompt);
    app.submit();
}

/// Poll the app the way the frame loop does until the generation lands.
pub async fn wait_for_generation(app: &mut App) {
    for _ in 0..500 {
        app.process_generation_events();
        if !app.is_loading() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("generation did not finish within 5s");
}
