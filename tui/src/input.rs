//! Input handling for the Pagesmith TUI.

use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::debug;

use pagesmith_engine::{App, Phase, ViewMode};

const INPUT_POLL_TIMEOUT: Duration = Duration::from_millis(25); // shutdown responsiveness
const INPUT_CHANNEL_CAPACITY: usize = 1024; // bounded: no OOM
const MAX_EVENTS_PER_FRAME: usize = 64; // never starve rendering
const CODE_PAGE_ROWS: u16 = 10;

/// Heuristics for detecting paste when the terminal doesn't emit `Event::Paste`.
///
/// Without bracketed paste, a paste arrives as a burst of key events. During a
/// burst, bare `Enter` inserts a newline instead of sending the prompt.
const PASTE_INTER_KEY_THRESHOLD: Duration = Duration::from_millis(20);
const PASTE_IDLE_TIMEOUT: Duration = Duration::from_millis(75);
const PASTE_QUEUE_THRESHOLD: usize = 32;

enum InputMsg {
    Event(Event),
    Error(String),
}

/// Pure timing mechanism for detecting paste bursts.
#[derive(Debug)]
struct PasteDetector {
    last_key_time: Instant,
    active_until: Instant,
}

impl PasteDetector {
    fn new(now: Instant) -> Self {
        Self {
            last_key_time: now,
            active_until: now,
        }
    }

    fn reset(&mut self, now: Instant) {
        self.last_key_time = now;
        self.active_until = now;
    }

    fn update(&mut self, now: Instant, backlog: usize, event: &Event) -> bool {
        // Only key press + repeat events participate in detection.
        let is_key_event = matches!(
            event,
            Event::Key(KeyEvent {
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            })
        );

        let was_active = now < self.active_until;
        let backlog_high = backlog >= PASTE_QUEUE_THRESHOLD;
        let rapid =
            is_key_event && now.duration_since(self.last_key_time) < PASTE_INTER_KEY_THRESHOLD;

        let active = was_active || backlog_high || rapid;

        if is_key_event {
            if active {
                // Keep paste mode alive across frame pacing and scheduling hiccups.
                self.active_until = now + PASTE_IDLE_TIMEOUT;
            }
            self.last_key_time = now;
        }

        active
    }
}

pub struct InputPump {
    rx: mpsc::Receiver<InputMsg>,
    stop: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<()>>,
    paste: PasteDetector,
}

impl InputPump {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let stop = Arc::new(AtomicBool::new(false));
        let stop2 = stop.clone();

        let join = tokio::task::spawn_blocking(move || input_loop(stop2, tx));
        Self {
            rx,
            stop,
            join: Some(join),
            paste: PasteDetector::new(Instant::now()),
        }
    }

    pub async fn shutdown(&mut self) {
        // Close the receiver first so a backpressured input thread unblocks.
        self.rx.close();

        self.stop.store(true, Ordering::Release);
        if let Some(join) = self.join.take() {
            let _ = tokio::time::timeout(Duration::from_secs(2), join).await;
        }
    }
}

impl Default for InputPump {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputPump {
    fn drop(&mut self) {
        // Best-effort stop if caller exits early; do not block in Drop.
        self.rx.close();
        self.stop.store(true, Ordering::Release);
    }
}

fn input_loop(stop: Arc<AtomicBool>, tx: mpsc::Sender<InputMsg>) {
    while !stop.load(Ordering::Acquire) {
        match event::poll(INPUT_POLL_TIMEOUT) {
            Ok(true) => match event::read() {
                Ok(ev) => {
                    // Bounded queue: apply backpressure instead of dropping events.
                    if tx.blocking_send(InputMsg::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                let _ = tx.blocking_send(InputMsg::Error(e.to_string()));
                break;
            }
        }
    }
}

/// Drain pending terminal events into `app`. Returns `true` once the app should quit.
pub fn handle_events(app: &mut App, input: &mut InputPump) -> Result<bool> {
    let mut processed = 0;
    while processed < MAX_EVENTS_PER_FRAME {
        let ev = match input.rx.try_recv() {
            Ok(InputMsg::Event(ev)) => ev,
            Ok(InputMsg::Error(msg)) => return Err(anyhow!("input error: {msg}")),
            Err(mpsc::error::TryRecvError::Empty) => break,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                return Err(anyhow!("input pump disconnected"));
            }
        };

        let now = Instant::now();
        let paste_active = if app.phase() == Phase::Idle && app.notice().is_none() {
            input.paste.update(now, input.rx.len(), &ev)
        } else {
            input.paste.reset(now);
            false
        };
        if paste_active {
            debug!("Input paste detection active (fallback heuristics)");
        }

        if apply_event(app, ev, paste_active) {
            return Ok(true);
        }
        processed += 1;
    }
    Ok(app.should_quit())
}

pub(crate) fn apply_event(app: &mut App, event: Event, paste_active: bool) -> bool {
    match event {
        Event::Key(key) => {
            // Handle press + repeat events (ignore releases)
            if matches!(key.kind, KeyEventKind::Release) {
                return app.should_quit();
            }

            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                app.request_quit();
                return true;
            }

            // A notice blocks everything except its dismissal.
            if app.notice().is_some() {
                if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                    app.dismiss_notice();
                }
                return app.should_quit();
            }

            match app.phase() {
                Phase::Idle => handle_composer_key(app, key, paste_active),
                Phase::Loading => {}
                Phase::Result => handle_result_key(app, key),
            }
        }
        Event::Paste(text) => {
            if app.notice().is_none()
                && let Some(composer) = app.composer_mut()
            {
                composer.draft_mut().enter_text(&text);
            }
        }
        _ => {}
    }
    app.should_quit()
}

fn handle_composer_key(app: &mut App, key: KeyEvent, paste_active: bool) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Enter if !paste_active && !(ctrl || alt || shift) => {
            app.submit();
            return;
        }
        KeyCode::Esc => {
            if app.composer().draft().text().is_empty() {
                app.request_quit();
            }
            return;
        }
        _ => {}
    }

    let Some(composer) = app.composer_mut() else {
        return;
    };
    if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
        composer.toggle_mode();
        return;
    }
    let draft = composer.draft_mut();
    match key.code {
        KeyCode::Enter => draft.enter_newline(),
        KeyCode::Char('j') if ctrl => draft.enter_newline(),
        KeyCode::Char('w') if ctrl => draft.delete_word_backwards(),
        KeyCode::Char('u') if ctrl => draft.clear(),
        KeyCode::Char('a') if ctrl => draft.move_cursor_home(),
        KeyCode::Char('e') if ctrl => draft.move_cursor_end(),
        KeyCode::Backspace if alt || ctrl => draft.delete_word_backwards(),
        KeyCode::Backspace => draft.delete_char(),
        KeyCode::Delete => draft.delete_char_forward(),
        KeyCode::Left => draft.move_cursor_left(),
        KeyCode::Right => draft.move_cursor_right(),
        KeyCode::Home => draft.move_cursor_home(),
        KeyCode::End => draft.move_cursor_end(),
        KeyCode::Char(c) if !ctrl && !alt => draft.enter_char(c),
        _ => {}
    }
}

fn handle_result_key(app: &mut App, key: KeyEvent) {
    let in_code = app.result().map(|r| r.view_mode()) == Some(ViewMode::Code);
    match key.code {
        KeyCode::Char('b') | KeyCode::Esc => app.reset(),
        KeyCode::Char('q') => app.request_quit(),
        KeyCode::Tab | KeyCode::BackTab => app.toggle_view_mode(),
        KeyCode::Char('p') => app.set_view_mode(ViewMode::Preview),
        KeyCode::Char('c') => app.set_view_mode(ViewMode::Code),
        KeyCode::Char('r') => app.regenerate(),
        KeyCode::Char('e') => {
            app.export();
        }
        KeyCode::Char('o') => app.open_preview(),
        KeyCode::Up | KeyCode::Char('k') if in_code => app.scroll_code_up(1),
        KeyCode::Down | KeyCode::Char('j') if in_code => app.scroll_code_down(1),
        KeyCode::PageUp if in_code => app.scroll_code_up(CODE_PAGE_ROWS),
        KeyCode::PageDown if in_code => app.scroll_code_down(CODE_PAGE_ROWS),
        KeyCode::Home | KeyCode::Char('g') if in_code => app.scroll_code_to_top(),
        KeyCode::End | KeyCode::Char('G') if in_code => app.scroll_code_to_bottom(),
        _ => {}
    }
}
