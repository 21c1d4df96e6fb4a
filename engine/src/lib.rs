//! Core engine for Pagesmith: the application state machine.
//!
//! This crate owns every piece of UI state without depending on the TUI. The
//! renderer reads it through accessors; the input layer drives it through the
//! operations below. At most one generation task exists at any time.

use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::oneshot;

mod atomic_write;
pub mod composer;
pub mod config;
pub mod credentials;
pub mod export;
pub mod preview;

pub use composer::{COMPOSER_MAX_ROWS, Composer, DraftInput, wrap_to_width};
pub use config::PagesmithConfig;
pub use credentials::CredentialSource;
pub use export::{EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME, ExportArtifact, ExportError};
pub use pagesmith_providers::{
    self, FailureKind, GeminiClient, GenerationError, PageGenerator, profile_for,
};
pub use pagesmith_types::{
    ApiKey, GeneratedPage, GenerationMode, GenerationRequest, PromptText, UiOptions, ViewMode,
    sanitize_source_for_display, sanitize_terminal_text,
};
pub use preview::{BrowserLauncher, PreviewError, SANDBOX_PERMISSIONS, launch_browser};

/// Title of the notice shown for every failed generation.
pub const GENERATION_FAILED_TITLE: &str = "Error generating code. Please try again.";

const STATUS_TTL: Duration = Duration::from_secs(5);

// ============================================================================
// Notices & status
// ============================================================================

/// A blocking message the user has to dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(title: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        let detail = detail.to_string();
        let detail = sanitize_terminal_text(detail.trim()).into_owned();
        Self {
            title: title.into(),
            detail: (!detail.is_empty()).then_some(detail),
        }
    }

    #[must_use]
    pub fn generation_failed(error: &GenerationError) -> Self {
        Self::new(GENERATION_FAILED_TITLE, error)
    }
}

#[derive(Debug, Clone)]
struct StatusLine {
    text: String,
    shown_at: Instant,
}

// ============================================================================
// Screens
// ============================================================================

/// Coarse controller state, derived from the current screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Result,
}

/// The result presenter. Existence proves a page was generated.
#[derive(Debug, Clone)]
pub struct ResultScreen {
    page: GeneratedPage,
    view_mode: ViewMode,
    code_scroll: u16,
    code_scroll_max: u16,
    preview_path: Option<PathBuf>,
}

impl ResultScreen {
    fn new(page: GeneratedPage) -> Self {
        Self {
            page,
            view_mode: ViewMode::default(),
            code_scroll: 0,
            code_scroll_max: 0,
            preview_path: None,
        }
    }

    #[must_use]
    pub fn page(&self) -> &GeneratedPage {
        &self.page
    }

    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// First visible row of the Code view.
    #[must_use]
    pub fn code_scroll(&self) -> u16 {
        self.code_scroll
    }

    /// Host document path, once the preview has been written.
    #[must_use]
    pub fn preview_path(&self) -> Option<&Path> {
        self.preview_path.as_deref()
    }
}

/// An in-flight generation. Existence proves a task was spawned.
#[derive(Debug)]
struct PendingGeneration {
    request: GenerationRequest,
    started: Instant,
    receiver: oneshot::Receiver<Result<GeneratedPage, GenerationError>>,
    /// Result to restore if a regenerate fails.
    resume: Option<ResultScreen>,
}

#[derive(Debug)]
enum Screen {
    Idle,
    Loading(PendingGeneration),
    Result(ResultScreen),
}

// ============================================================================
// Settings
// ============================================================================

/// Everything the controller needs from the environment.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub credentials: CredentialSource,
    pub export_dir: PathBuf,
    pub preview_dir: PathBuf,
    pub ui_options: UiOptions,
}

impl AppSettings {
    #[must_use]
    pub fn from_config(config: Option<&PagesmithConfig>) -> Self {
        let export_dir = config
            .and_then(PagesmithConfig::export_dir)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let preview_dir = config
            .and_then(PagesmithConfig::preview_dir)
            .or_else(|| config::data_dir().map(|dir| dir.join("preview")))
            .unwrap_or_else(|| std::env::temp_dir().join("pagesmith-preview"));

        Self {
            credentials: CredentialSource::from_config(
                config.and_then(PagesmithConfig::google_api_key),
            ),
            export_dir,
            preview_dir,
            ui_options: config.map(PagesmithConfig::ui_options).unwrap_or_default(),
        }
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    screen: Screen,
    composer: Composer,
    last_request: Option<GenerationRequest>,
    notice: Option<Notice>,
    status: Option<StatusLine>,
    generator: Arc<dyn PageGenerator>,
    settings: AppSettings,
    launcher: BrowserLauncher,
    tick: usize,
    should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(generator: Arc<dyn PageGenerator>, settings: AppSettings) -> Self {
        Self {
            screen: Screen::Idle,
            composer: Composer::default(),
            last_request: None,
            notice: None,
            status: None,
            generator,
            settings,
            launcher: launch_browser,
            tick: 0,
            should_quit: false,
        }
    }

    /// Build the production app: Gemini client plus settings from `config`.
    pub fn from_config(config: Option<&PagesmithConfig>) -> anyhow::Result<Self> {
        let client = match config.and_then(PagesmithConfig::api_base) {
            Some(base) => {
                tracing::info!("Using Gemini API base override: {base}");
                GeminiClient::with_base_url(base.as_str())
                    .with_context(|| format!("invalid [google] api_base: {base}"))?
            }
            None => GeminiClient::new(),
        };
        Ok(Self::new(
            Arc::new(client),
            AppSettings::from_config(config),
        ))
    }

    #[must_use]
    pub fn with_browser_launcher(mut self, launcher: BrowserLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.screen {
            Screen::Idle => Phase::Idle,
            Screen::Loading(_) => Phase::Loading,
            Screen::Result(_) => Phase::Result,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.screen, Screen::Loading(_))
    }

    #[must_use]
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    /// Editable composer; `None` unless the landing screen is showing.
    pub fn composer_mut(&mut self) -> Option<&mut Composer> {
        match self.screen {
            Screen::Idle => Some(&mut self.composer),
            Screen::Loading(_) | Screen::Result(_) => None,
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<&ResultScreen> {
        match &self.screen {
            Screen::Result(result) => Some(result),
            Screen::Idle | Screen::Loading(_) => None,
        }
    }

    fn result_mut(&mut self) -> Option<&mut ResultScreen> {
        match &mut self.screen {
            Screen::Result(result) => Some(result),
            Screen::Idle | Screen::Loading(_) => None,
        }
    }

    /// The request currently being generated.
    #[must_use]
    pub fn pending_request(&self) -> Option<&GenerationRequest> {
        match &self.screen {
            Screen::Loading(pending) => Some(&pending.request),
            Screen::Idle | Screen::Result(_) => None,
        }
    }

    #[must_use]
    pub fn loading_elapsed(&self) -> Option<Duration> {
        match &self.screen {
            Screen::Loading(pending) => Some(pending.started.elapsed()),
            Screen::Idle | Screen::Result(_) => None,
        }
    }

    #[must_use]
    pub fn last_request(&self) -> Option<&GenerationRequest> {
        self.last_request.as_ref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.text.as_str())
    }

    #[must_use]
    pub fn ui_options(&self) -> UiOptions {
        self.settings.ui_options
    }

    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.settings.export_dir
    }

    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.tick
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    /// Advance the animation clock and expire the status line.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        if self
            .status
            .as_ref()
            .is_some_and(|status| status.shown_at.elapsed() >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(StatusLine {
            text: message.into(),
            shown_at: Instant::now(),
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    fn show_notice(&mut self, notice: Notice) {
        self.status = None;
        self.notice = Some(notice);
    }

    // ------------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------------

    /// Send the composer draft. No-op unless idle with a non-blank draft.
    pub fn submit(&mut self) {
        if !matches!(self.screen, Screen::Idle) {
            return;
        }
        let Some(request) = self.composer.submit(self.is_loading()) else {
            return;
        };
        self.start_generation(request, None);
    }

    /// Replay the last request from the result screen.
    pub fn regenerate(&mut self) {
        if !matches!(self.screen, Screen::Result(_)) {
            return;
        }
        let Some(request) = self.last_request.clone() else {
            return;
        };
        let Screen::Result(current) = mem::replace(&mut self.screen, Screen::Idle) else {
            return;
        };
        self.start_generation(request, Some(current));
    }

    fn start_generation(&mut self, request: GenerationRequest, resume: Option<ResultScreen>) {
        let fallback = |resume: Option<ResultScreen>| match resume {
            Some(result) => Screen::Result(result),
            None => Screen::Idle,
        };

        // Resolved per call; the generator never reads ambient state.
        let Some(api_key) = self.settings.credentials.resolve() else {
            tracing::warn!("Generation requested without an API key");
            self.screen = fallback(resume);
            self.show_notice(Notice::generation_failed(
                &GenerationError::MissingCredential,
            ));
            return;
        };

        let mode = request.mode();
        tracing::info!(
            mode = mode.label(),
            model = profile_for(mode).model,
            prompt_chars = request.prompt().as_str().chars().count(),
            regenerate = resume.is_some(),
            "Starting generation"
        );

        let (tx, rx) = oneshot::channel();
        let generation = self.generator.generate(Some(api_key), request.clone());
        tokio::spawn(async move {
            let _ = tx.send(generation.await);
        });

        self.last_request = Some(request.clone());
        self.status = None;
        self.screen = Screen::Loading(PendingGeneration {
            request,
            started: Instant::now(),
            receiver: rx,
            resume,
        });
    }

    /// Poll the in-flight generation and apply its outcome.
    ///
    /// Call once per frame. A task that disappears without answering counts as
    /// a transport failure, so `Loading` always ends once the task does.
    pub fn process_generation_events(&mut self) {
        let outcome = {
            let Screen::Loading(pending) = &mut self.screen else {
                return;
            };
            match pending.receiver.try_recv() {
                Ok(outcome) => outcome,
                Err(oneshot::error::TryRecvError::Empty) => return,
                Err(oneshot::error::TryRecvError::Closed) => {
                    tracing::warn!("Generation task ended without a result");
                    Err(GenerationError::Transport(
                        "generation task ended without a result".to_string(),
                    ))
                }
            }
        };

        let Screen::Loading(pending) = mem::replace(&mut self.screen, Screen::Idle) else {
            return;
        };
        let PendingGeneration {
            request,
            started,
            resume,
            ..
        } = pending;
        let elapsed = started.elapsed();

        match outcome {
            Ok(page) => {
                tracing::info!(
                    mode = request.mode().label(),
                    bytes = page.html().len(),
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Generation finished"
                );
                self.composer.clear_draft();
                let mut result = ResultScreen::new(page);
                // The live preview is published with every new page; `o` only opens it.
                match preview::write_preview(&self.settings.preview_dir, &result.page) {
                    Ok(path) => result.preview_path = Some(path),
                    Err(err) => tracing::warn!("Preview not written: {err}"),
                }
                self.screen = Screen::Result(result);
            }
            Err(err) => {
                match err.kind() {
                    FailureKind::Configuration => tracing::warn!("Generation failed: {err}"),
                    FailureKind::Transport | FailureKind::EmptyResult => {
                        tracing::error!(
                            mode = request.mode().label(),
                            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                            "Generation failed: {err}"
                        );
                    }
                }
                self.screen = match resume {
                    Some(previous) => Screen::Result(previous),
                    None => Screen::Idle,
                };
                self.show_notice(Notice::generation_failed(&err));
            }
        }
    }

    /// Leave the result screen: drop the page and the last request.
    pub fn reset(&mut self) {
        if !matches!(self.screen, Screen::Result(_)) {
            return;
        }
        self.screen = Screen::Idle;
        self.last_request = None;
        self.status = None;
    }

    // ------------------------------------------------------------------------
    // Result presenter
    // ------------------------------------------------------------------------

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        if let Some(result) = self.result_mut() {
            result.view_mode = view_mode;
        }
    }

    pub fn toggle_view_mode(&mut self) {
        if let Some(result) = self.result_mut() {
            result.view_mode = result.view_mode.toggle();
        }
    }

    /// Record how far the Code view can scroll for the current viewport.
    pub fn update_code_scroll_max(&mut self, max: u16) {
        if let Some(result) = self.result_mut() {
            result.code_scroll_max = max;
            result.code_scroll = result.code_scroll.min(max);
        }
    }

    pub fn scroll_code_up(&mut self, rows: u16) {
        if let Some(result) = self.result_mut() {
            result.code_scroll = result.code_scroll.saturating_sub(rows);
        }
    }

    pub fn scroll_code_down(&mut self, rows: u16) {
        if let Some(result) = self.result_mut() {
            result.code_scroll = result
                .code_scroll
                .saturating_add(rows)
                .min(result.code_scroll_max);
        }
    }

    pub fn scroll_code_to_top(&mut self) {
        if let Some(result) = self.result_mut() {
            result.code_scroll = 0;
        }
    }

    pub fn scroll_code_to_bottom(&mut self) {
        if let Some(result) = self.result_mut() {
            result.code_scroll = result.code_scroll_max;
        }
    }

    /// The current page as a downloadable artifact, without touching disk.
    #[must_use]
    pub fn export_artifact(&self) -> Option<ExportArtifact> {
        self.result()
            .map(|result| ExportArtifact::from_page(&result.page))
    }

    /// Write the current page to `<export_dir>/index.html`.
    pub fn export(&mut self) -> Option<PathBuf> {
        let artifact = self.export_artifact()?;
        match export::write_artifact(&self.settings.export_dir, &artifact) {
            Ok(path) => {
                self.set_status(format!("Exported {}", path.display()));
                Some(path)
            }
            Err(err) => {
                tracing::error!("Export failed: {err}");
                self.show_notice(Notice::new("Export failed.", &err));
                None
            }
        }
    }

    /// Rewrite the sandbox host document and open it in the browser.
    pub fn open_preview(&mut self) {
        let preview_dir = self.settings.preview_dir.clone();
        let launcher = self.launcher;
        let Some(result) = self.result_mut() else {
            return;
        };

        let path = match preview::write_preview(&preview_dir, &result.page) {
            Ok(path) => path,
            Err(err) => {
                tracing::error!("Preview failed: {err}");
                self.show_notice(Notice::new("Could not write the preview.", &err));
                return;
            }
        };
        result.preview_path = Some(path.clone());

        match preview::open_in_browser(launcher, &path) {
            Ok(()) => self.set_status("Opened preview in browser"),
            Err(err) => self.show_notice(Notice::new("Could not open the browser.", &err)),
        }
    }
}
