//! Rendering and key-routing tests against ratatui's `TestBackend`.

use std::path::Path;
use std::sync::Arc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use ratatui::{Terminal, backend::TestBackend};
use tempfile::tempdir;

use pagesmith_engine::{
    ApiKey, App, AppSettings, CredentialSource, GENERATION_FAILED_TITLE, GeneratedPage,
    GenerationError, GenerationMode, GenerationRequest, PageGenerator, Phase, UiOptions, ViewMode,
};

use super::draw;
use super::input::apply_event;

/// Answers every generation with the same page, or never when `html` is `None`.
struct FixedGenerator {
    html: Option<String>,
}

impl PageGenerator for FixedGenerator {
    fn generate(
        &self,
        _api_key: Option<ApiKey>,
        _request: GenerationRequest,
    ) -> BoxFuture<'static, Result<GeneratedPage, GenerationError>> {
        match &self.html {
            Some(html) => future::ready(Ok(GeneratedPage::new(html.clone()))).boxed(),
            None => future::pending().boxed(),
        }
    }
}

fn app_with(dir: &Path, html: Option<&str>, key: Option<&str>) -> App {
    let settings = AppSettings {
        credentials: CredentialSource::Fixed(key.map(|k| ApiKey::new(k).unwrap())),
        export_dir: dir.join("out"),
        preview_dir: dir.join("preview"),
        ui_options: UiOptions {
            ascii_only: true,
            high_contrast: false,
        },
    };
    let generator = FixedGenerator {
        html: html.map(str::to_string),
    };
    App::new(Arc::new(generator), settings).with_browser_launcher(|_| Ok(()))
}

fn key(code: KeyCode) -> Event {
    Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Event {
    Event::Key(KeyEvent::new(code, modifiers))
}

fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        apply_event(app, key(KeyCode::Char(c)), false);
    }
}

async fn settle(app: &mut App) {
    for _ in 0..100 {
        app.process_generation_events();
        if !app.is_loading() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("generation never settled");
}

async fn app_on_result(dir: &Path, html: &str) -> App {
    let mut app = app_with(dir, Some(html), Some("test-key"));
    type_text(&mut app, "a pomodoro timer");
    apply_event(&mut app, key(KeyCode::Enter), false);
    settle(&mut app).await;
    assert_eq!(app.phase(), Phase::Result);
    app
}

fn render(app: &mut App, width: u16, height: u16) -> Terminal<TestBackend> {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
    terminal.draw(|frame| draw(frame, app)).unwrap();
    terminal
}

fn screen_text(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let width = buffer.area.width as usize;
    let mut out = String::new();
    for (i, cell) in buffer.content().iter().enumerate() {
        if i > 0 && i % width == 0 {
            out.push('\n');
        }
        out.push_str(cell.symbol());
    }
    out
}

// ============================================================================
// Rendering
// ============================================================================

#[tokio::test]
async fn landing_shows_composer_and_mode_chips() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));

    let text = screen_text(&render(&mut app, 80, 24));

    assert!(text.contains("What do you want to build?"));
    assert!(text.contains("e.g. a pomodoro timer"));
    assert!(text.contains("Fast"));
    assert!(text.contains("Think"));
    assert!(text.contains("Send"));
}

#[tokio::test]
async fn typed_draft_replaces_placeholder() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));
    type_text(&mut app, "landing page for a bakery");

    let text = screen_text(&render(&mut app, 80, 24));

    assert!(text.contains("landing page for a bakery"));
    assert!(!text.contains("e.g. a pomodoro timer"));
}

#[tokio::test]
async fn loading_screen_names_the_model() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));
    type_text(&mut app, "a pomodoro timer");
    apply_event(&mut app, key(KeyCode::Enter), false);
    assert_eq!(app.phase(), Phase::Loading);

    let text = screen_text(&render(&mut app, 80, 24));

    assert!(text.contains("Generating your page"));
    assert!(text.contains(GenerationMode::Fast.description()));
    assert!(text.contains("a pomodoro timer"));
    assert!(!text.contains("Thinking mode can take"));
}

#[tokio::test]
async fn thinking_loading_screen_warns_about_latency() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));
    apply_event(&mut app, key(KeyCode::Tab), false);
    type_text(&mut app, "a chess board");
    apply_event(&mut app, key(KeyCode::Enter), false);

    let text = screen_text(&render(&mut app, 80, 24));

    assert!(text.contains(GenerationMode::Thinking.description()));
    assert!(text.contains("Thinking mode can take"));
}

#[tokio::test]
async fn preview_tab_summarizes_the_page() {
    let dir = tempdir().unwrap();
    let mut app = app_on_result(
        dir.path(),
        "<html><head><title>Pomodoro</title></head><body></body></html>",
    )
    .await;

    let text = screen_text(&render(&mut app, 160, 30));

    assert!(text.contains("Pomodoro"));
    assert!(text.contains("allow-scripts"));
    assert!(text.contains("preview.html"));
    assert!(!text.contains("not written yet"));
}

#[tokio::test]
async fn code_view_strips_terminal_escapes() {
    let dir = tempdir().unwrap();
    let mut app = app_on_result(dir.path(), "<p>\x1b]52;c;aGk=\x07hi\x1b[2J</p>").await;
    app.set_view_mode(ViewMode::Code);

    let terminal = render(&mut app, 80, 24);
    let text = screen_text(&terminal);

    assert!(text.contains("index.html"));
    assert!(text.contains("<p>hi</p>"));
    assert!(
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .all(|cell| !cell.symbol().chars().any(char::is_control))
    );
}

#[tokio::test]
async fn failed_generation_shows_notice_overlay() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, None);
    type_text(&mut app, "a pomodoro timer");
    apply_event(&mut app, key(KeyCode::Enter), false);
    assert!(app.notice().is_some());

    let text = screen_text(&render(&mut app, 80, 24));

    assert!(text.contains(GENERATION_FAILED_TITLE));
    assert!(text.contains("dismiss"));
}

// ============================================================================
// Composer keys
// ============================================================================

#[tokio::test]
async fn enter_submits_and_modified_enter_inserts_newline() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));

    type_text(&mut app, "one");
    apply_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::SHIFT), false);
    apply_event(&mut app, key_with(KeyCode::Char('j'), KeyModifiers::CONTROL), false);
    type_text(&mut app, "two");
    assert_eq!(app.composer().draft().text(), "one\n\ntwo");
    assert_eq!(app.phase(), Phase::Idle);

    apply_event(&mut app, key(KeyCode::Enter), false);
    assert_eq!(app.phase(), Phase::Loading);
    assert_eq!(
        app.pending_request().unwrap().prompt().as_str(),
        "one\n\ntwo"
    );
}

#[tokio::test]
async fn enter_during_paste_burst_is_a_newline() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));

    type_text(&mut app, "line");
    apply_event(&mut app, key(KeyCode::Enter), true);

    assert_eq!(app.phase(), Phase::Idle);
    assert_eq!(app.composer().draft().text(), "line\n");
}

#[tokio::test]
async fn bracketed_paste_lands_in_the_draft() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));

    apply_event(&mut app, Event::Paste("a timer\nwith sounds".to_string()), false);

    assert_eq!(app.composer().draft().text(), "a timer\nwith sounds");
    assert_eq!(app.phase(), Phase::Idle);
}

#[tokio::test]
async fn tab_toggles_mode_and_esc_quits_only_when_empty() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));

    apply_event(&mut app, key(KeyCode::Tab), false);
    assert_eq!(app.composer().mode(), GenerationMode::Thinking);
    apply_event(&mut app, key(KeyCode::BackTab), false);
    assert_eq!(app.composer().mode(), GenerationMode::Fast);

    type_text(&mut app, "x");
    assert!(!apply_event(&mut app, key(KeyCode::Esc), false));
    apply_event(&mut app, key(KeyCode::Backspace), false);
    assert!(apply_event(&mut app, key(KeyCode::Esc), false));
}

#[tokio::test]
async fn key_releases_are_ignored() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));
    let mut release = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
    release.kind = KeyEventKind::Release;

    apply_event(&mut app, Event::Key(release), false);

    assert_eq!(app.composer().draft().text(), "");
}

#[tokio::test]
async fn notice_swallows_keys_until_dismissed() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, None);
    type_text(&mut app, "draft");
    apply_event(&mut app, key(KeyCode::Enter), false);
    assert!(app.notice().is_some());

    type_text(&mut app, "zz");
    assert_eq!(app.composer().draft().text(), "draft");
    assert!(app.notice().is_some());

    apply_event(&mut app, key(KeyCode::Enter), false);
    assert!(app.notice().is_none());
    assert_eq!(app.phase(), Phase::Idle);
}

#[tokio::test]
async fn ctrl_c_quits_while_loading() {
    let dir = tempdir().unwrap();
    let mut app = app_with(dir.path(), None, Some("test-key"));
    type_text(&mut app, "slow page");
    apply_event(&mut app, key(KeyCode::Enter), false);

    assert!(!apply_event(&mut app, key(KeyCode::Char('q')), false));
    assert!(apply_event(
        &mut app,
        key_with(KeyCode::Char('c'), KeyModifiers::CONTROL),
        false
    ));
}

// ============================================================================
// Result keys
// ============================================================================

#[tokio::test]
async fn result_keys_switch_views_and_reset() {
    let dir = tempdir().unwrap();
    let mut app = app_on_result(dir.path(), "<p>hi</p>").await;

    apply_event(&mut app, key(KeyCode::Char('c')), false);
    assert_eq!(app.result().unwrap().view_mode(), ViewMode::Code);
    apply_event(&mut app, key(KeyCode::Tab), false);
    assert_eq!(app.result().unwrap().view_mode(), ViewMode::Preview);

    apply_event(&mut app, key(KeyCode::Char('b')), false);
    assert_eq!(app.phase(), Phase::Idle);
    assert!(app.last_request().is_none());
}

#[tokio::test]
async fn regenerate_key_reloads() {
    let dir = tempdir().unwrap();
    let mut app = app_on_result(dir.path(), "<p>hi</p>").await;

    apply_event(&mut app, key(KeyCode::Char('r')), false);
    assert_eq!(app.phase(), Phase::Loading);
    settle(&mut app).await;
    assert_eq!(app.phase(), Phase::Result);
}

#[tokio::test]
async fn export_and_open_keys_write_files() {
    let dir = tempdir().unwrap();
    let mut app = app_on_result(dir.path(), "<p>hi</p>").await;

    apply_event(&mut app, key(KeyCode::Char('e')), false);
    let exported = std::fs::read_to_string(dir.path().join("out").join("index.html")).unwrap();
    assert_eq!(exported, "<p>hi</p>");

    apply_event(&mut app, key(KeyCode::Char('o')), false);
    assert!(app.result().unwrap().preview_path().is_some());
    assert_eq!(app.status_message(), Some("Opened preview in browser"));
}

#[tokio::test]
async fn code_scroll_keys_follow_rendered_height() {
    let dir = tempdir().unwrap();
    let html: String = (0..200).map(|i| format!("<p>{i}</p>\n")).collect();
    let mut app = app_on_result(dir.path(), &html).await;

    // Scroll keys do nothing in Preview.
    apply_event(&mut app, key(KeyCode::Char('j')), false);
    assert_eq!(app.result().unwrap().code_scroll(), 0);

    apply_event(&mut app, key(KeyCode::Char('c')), false);
    render(&mut app, 80, 24);

    apply_event(&mut app, key(KeyCode::Down), false);
    assert_eq!(app.result().unwrap().code_scroll(), 1);
    apply_event(&mut app, key(KeyCode::Char('G')), false);
    let bottom = app.result().unwrap().code_scroll();
    assert!(bottom > 1);
    apply_event(&mut app, key(KeyCode::Char('j')), false);
    assert_eq!(app.result().unwrap().code_scroll(), bottom);
    apply_event(&mut app, key(KeyCode::Char('g')), false);
    assert_eq!(app.result().unwrap().code_scroll(), 0);
}
