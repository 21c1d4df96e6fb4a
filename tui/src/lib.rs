//! TUI rendering for Pagesmith using ratatui.
//!
//! Three screens follow the controller phase (landing, loading, result) and a
//! notice overlay sits on top of whichever is showing. Generated source and
//! backend messages are sanitized before they reach the terminal.

mod input;
mod theme;

pub use input::{InputPump, handle_events};
pub use theme::{Glyphs, Palette, glyphs, palette, spinner_frame, styles};

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, Padding, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};

use pagesmith_engine::{
    App, EXPORT_FILE_NAME, GenerationMode, Notice, Phase, ResultScreen,
    SANDBOX_PERMISSIONS, ViewMode, sanitize_source_for_display, sanitize_terminal_text,
    wrap_to_width,
};

const LANDING_MAX_WIDTH: u16 = 96;
const NOTICE_MAX_WIDTH: u16 = 64;
const PROMPT_EXCERPT_CHARS: usize = 120;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
    let options = app.ui_options();
    let palette = palette(options);
    let glyphs = glyphs(options);
    // Clear with background color
    let bg_block = Block::default().style(Style::default().bg(palette.bg_dark));
    frame.render_widget(bg_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(1),    // Body
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0], &palette, &glyphs);
    match app.phase() {
        Phase::Idle => draw_landing(frame, app, chunks[1], &palette, &glyphs),
        Phase::Loading => draw_loading(frame, app, chunks[1], &palette, &glyphs),
        Phase::Result => draw_result(frame, app, chunks[1], &palette, &glyphs),
    }
    draw_status_bar(frame, app, chunks[2], &palette, &glyphs);

    if let Some(notice) = app.notice() {
        draw_notice(frame, notice, &palette, &glyphs);
    }
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let mut spans = vec![
        Span::styled(format!("{} ", glyphs.brand), styles::title(palette)),
        Span::styled("Pagesmith", styles::title(palette)),
    ];
    if let Some(result) = app.result() {
        let title = result
            .page()
            .title()
            .map(|title| sanitize_terminal_text(title).into_owned())
            .unwrap_or_else(|| "Untitled page".to_string());
        spans.push(Span::styled(
            format!(" {} ", glyphs.separator),
            Style::default().fg(palette.text_muted),
        ));
        spans.push(Span::styled(
            truncate_with_ellipsis(&title, area.width.saturating_sub(16) as usize),
            Style::default().fg(palette.text_secondary),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ============================================================================
// Landing
// ============================================================================

fn draw_landing(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let width = area.width.min(LANDING_MAX_WIDTH);
    let column = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height: area.height,
    };

    // Borders take two columns; one more for the cursor at end of line.
    let text_width = column.width.saturating_sub(3).max(1);
    let composer = app.composer();
    let rows = composer.visible_rows(text_width as usize);
    let composer_height = rows + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),                  // Hero
            Constraint::Length(composer_height), // Composer
            Constraint::Length(1),               // Mode chips + send
            Constraint::Length(1),               // Spacer
            Constraint::Length(1),               // Hints
        ])
        .split(column);

    let hero = vec![
        Line::from(""),
        Line::from(Span::styled(
            "What do you want to build?",
            Style::default()
                .fg(palette.text_primary)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Describe a page. It comes back as one self-contained HTML file.",
            Style::default().fg(palette.text_muted),
        )),
    ];
    let hero_height = chunks[0].height;
    let hero_area = Rect {
        y: chunks[0].y + hero_height.saturating_sub(hero.len() as u16 + 1),
        height: hero_height.min(hero.len() as u16 + 1),
        ..chunks[0]
    };
    frame.render_widget(
        Paragraph::new(hero).alignment(Alignment::Center),
        hero_area,
    );

    draw_composer(frame, app, chunks[1], text_width, rows, palette);
    draw_mode_row(frame, app, chunks[2], palette, glyphs);

    let hints = Line::from(vec![
        Span::styled("Enter", styles::key_highlight(palette)),
        Span::styled(" send  ", styles::key_hint(palette)),
        Span::styled("Shift+Enter", styles::key_highlight(palette)),
        Span::styled(" newline  ", styles::key_hint(palette)),
        Span::styled("Tab", styles::key_highlight(palette)),
        Span::styled(" mode  ", styles::key_hint(palette)),
        Span::styled("Ctrl+C", styles::key_highlight(palette)),
        Span::styled(" quit", styles::key_hint(palette)),
    ]);
    frame.render_widget(Paragraph::new(hints).alignment(Alignment::Center), chunks[4]);
}

fn draw_composer(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    text_width: u16,
    rows: u16,
    palette: &Palette,
) {
    let draft = app.composer().draft();
    let wrapped = draft.wrapped_lines(text_width as usize);
    let (cursor_row, cursor_col) = draft.cursor_visual(text_width as usize);
    // Keep the cursor row inside the capped box.
    let offset = cursor_row.saturating_sub(rows.saturating_sub(1) as usize);

    let lines: Vec<Line> = if draft.text().is_empty() {
        vec![Line::from(Span::styled(
            "e.g. a pomodoro timer with a dark theme",
            Style::default()
                .fg(palette.text_muted)
                .add_modifier(Modifier::ITALIC),
        ))]
    } else {
        wrapped
            .iter()
            .skip(offset)
            .take(rows as usize)
            .map(|row| {
                Line::from(Span::styled(
                    sanitize_terminal_text(row).into_owned(),
                    Style::default().fg(palette.text_primary),
                ))
            })
            .collect()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border_focused(palette))
        .style(Style::default().bg(palette.bg_panel));
    let inner = block.inner(area);
    frame.render_widget(Paragraph::new(lines).block(block), area);

    if app.notice().is_none() {
        let x = inner.x + (cursor_col as u16).min(inner.width.saturating_sub(1));
        let y = inner.y + ((cursor_row - offset) as u16).min(rows.saturating_sub(1));
        frame.set_cursor_position((x, y));
    }
}

fn draw_mode_row(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let selected = app.composer().mode();
    let mut spans = Vec::new();
    for mode in GenerationMode::ALL {
        let icon = match mode {
            GenerationMode::Fast => glyphs.fast,
            GenerationMode::Thinking => glyphs.thinking,
        };
        let style = if mode == selected {
            styles::chip_active(palette)
        } else {
            styles::chip_inactive(palette)
        };
        spans.push(Span::styled(format!(" {icon} {} ", mode.label()), style));
        spans.push(Span::raw(" "));
    }

    let send_style = if app.composer().can_submit(app.is_loading()) {
        styles::send_ready(palette)
    } else {
        styles::send_disabled(palette)
    };
    let send = Line::from(Span::styled(format!(" {} Send ", glyphs.send), send_style));

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(send.width() as u16)])
        .split(area);
    frame.render_widget(Paragraph::new(Line::from(spans)), halves[0]);
    frame.render_widget(Paragraph::new(send), halves[1]);
}

// ============================================================================
// Loading
// ============================================================================

fn draw_loading(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let Some(request) = app.pending_request() else {
        return;
    };
    let spinner = spinner_frame(app.tick_count(), app.ui_options());
    let elapsed = app.loading_elapsed().unwrap_or_default().as_secs();
    let mode = request.mode();
    let prompt = sanitize_terminal_text(request.prompt().as_str()).replace('\n', " ");

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("{spinner} "), Style::default().fg(palette.accent)),
            Span::styled(
                "Generating your page",
                Style::default()
                    .fg(palette.text_primary)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            format!("Using {} {} {elapsed}s", mode.description(), glyphs.bullet),
            Style::default().fg(palette.text_muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "\u{201c}{}\u{201d}",
                truncate_with_ellipsis(&prompt, PROMPT_EXCERPT_CHARS)
            ),
            Style::default()
                .fg(palette.text_secondary)
                .add_modifier(Modifier::ITALIC),
        )),
    ];
    if mode == GenerationMode::Thinking {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Thinking mode can take a few minutes.",
            Style::default().fg(palette.text_muted),
        )));
    }

    let height = (lines.len() as u16).min(area.height);
    let centered = Rect {
        y: area.y + area.height.saturating_sub(height) / 2,
        height,
        ..area
    };
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        centered,
    );
}

// ============================================================================
// Result
// ============================================================================

fn draw_result(frame: &mut Frame, app: &mut App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let Some(view_mode) = app.result().map(ResultScreen::view_mode) else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let tab = |mode: ViewMode, icon: &str| {
        let style = if mode == view_mode {
            styles::chip_active(palette)
        } else {
            styles::chip_inactive(palette)
        };
        Span::styled(format!(" {icon} {} ", mode.label()), style)
    };
    let tabs = Line::from(vec![
        tab(ViewMode::Preview, glyphs.preview),
        Span::raw(" "),
        tab(ViewMode::Code, glyphs.code),
    ]);
    frame.render_widget(Paragraph::new(tabs), chunks[0]);

    match view_mode {
        ViewMode::Preview => draw_preview_summary(frame, app, chunks[1], palette, glyphs),
        ViewMode::Code => draw_code_view(frame, app, chunks[1], palette, glyphs),
    }
}

fn draw_preview_summary(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    palette: &Palette,
    glyphs: &Glyphs,
) {
    let Some(result) = app.result() else {
        return;
    };
    let page = result.page();
    let title = page
        .title()
        .map_or_else(|| "(no <title>)".to_string(), |t| sanitize_terminal_text(t).into_owned());

    let label = |text: &'static str| {
        Span::styled(format!("{text:<10}"), Style::default().fg(palette.text_muted))
    };
    let value = |text: String| Span::styled(text, Style::default().fg(palette.text_primary));

    let mut lines = vec![
        Line::from(vec![label("Title"), value(title)]),
        Line::from(vec![
            label("Size"),
            value(format!(
                "{} bytes {} {} lines",
                page.html().len(),
                glyphs.bullet,
                page.line_count()
            )),
        ]),
        Line::from(vec![
            label("Sandbox"),
            value(SANDBOX_PERMISSIONS.join(" ")),
        ]),
    ];
    match result.preview_path() {
        Some(path) => lines.push(Line::from(vec![
            label("Preview"),
            Span::styled(
                sanitize_terminal_text(&path.display().to_string()).into_owned(),
                Style::default().fg(palette.blue),
            ),
        ])),
        None => lines.push(Line::from(vec![
            label("Preview"),
            Span::styled("not written yet", Style::default().fg(palette.text_muted)),
        ])),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Press ", styles::key_hint(palette)),
        Span::styled("o", styles::key_highlight(palette)),
        Span::styled(
            " to open the live preview in your browser. The page runs in a sandboxed frame.",
            styles::key_hint(palette),
        ),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette))
        .padding(Padding::horizontal(1))
        .title(Span::styled(" Live preview ", styles::title(palette)));
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_code_view(frame: &mut Frame, app: &mut App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(styles::border(palette))
        .title(Span::styled(format!(" {EXPORT_FILE_NAME} "), styles::title(palette)));
    let inner = block.inner(area);
    // Leave a column for the scrollbar.
    let text_width = inner.width.saturating_sub(1).max(1);

    let rows = match app.result() {
        Some(result) => {
            let source = sanitize_source_for_display(result.page().html());
            wrap_to_width(&source, text_width as usize)
        }
        None => return,
    };

    let total = u16::try_from(rows.len()).unwrap_or(u16::MAX);
    let max_scroll = total.saturating_sub(inner.height);
    app.update_code_scroll_max(max_scroll);
    let offset = app.result().map_or(0, ResultScreen::code_scroll);

    let lines: Vec<Line> = rows
        .into_iter()
        .skip(offset as usize)
        .take(inner.height as usize)
        .map(|row| Line::from(Span::styled(row, Style::default().fg(palette.text_secondary))))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);

    // Only render scrollbar when content exceeds viewport
    if max_scroll > 0 {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None)
            .track_symbol(Some(glyphs.separator))
            .style(Style::default().fg(palette.text_muted));
        let mut scrollbar_state =
            ScrollbarState::new(max_scroll as usize).position(offset as usize);
        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

// ============================================================================
// Status bar & notice
// ============================================================================

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, palette: &Palette, glyphs: &Glyphs) {
    if let Some(status) = app.status_message() {
        let line = Line::from(vec![
            Span::styled(format!("{} ", glyphs.ok), Style::default().fg(palette.success)),
            Span::styled(
                sanitize_terminal_text(status).into_owned(),
                Style::default().fg(palette.text_secondary),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let keys: &[(&str, &str)] = match app.phase() {
        Phase::Idle => &[("Enter", "send"), ("Tab", "mode"), ("Esc", "quit")],
        Phase::Loading => &[("Ctrl+C", "quit")],
        Phase::Result => match app.result().map(ResultScreen::view_mode) {
            Some(ViewMode::Code) => &[
                ("b", "back"),
                ("Tab", "preview"),
                ("r", "regenerate"),
                ("e", "export"),
                ("o", "open"),
                ("\u{2191}\u{2193}", "scroll"),
            ],
            _ => &[
                ("b", "back"),
                ("Tab", "code"),
                ("r", "regenerate"),
                ("e", "export"),
                ("o", "open"),
            ],
        },
    };

    let mut spans = Vec::new();
    for (i, (key, action)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(
                format!(" {} ", glyphs.separator),
                Style::default().fg(palette.bg_border),
            ));
        }
        spans.push(Span::styled(*key, styles::key_highlight(palette)));
        spans.push(Span::styled(format!(" {action}"), styles::key_hint(palette)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_notice(frame: &mut Frame, notice: &Notice, palette: &Palette, glyphs: &Glyphs) {
    let area = frame.area();
    let width = NOTICE_MAX_WIDTH.min(area.width.saturating_sub(4)).max(10);
    let inner_width = width.saturating_sub(4).max(1);

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{} ", glyphs.error), styles::error_title(palette)),
        Span::styled(notice.title.clone(), styles::error_title(palette)),
    ])];
    if let Some(detail) = &notice.detail {
        lines.push(Line::from(""));
        for row in wrap_to_width(detail, inner_width as usize) {
            lines.push(Line::from(Span::styled(
                row,
                Style::default().fg(palette.text_secondary),
            )));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Enter", styles::key_highlight(palette)),
        Span::styled(" dismiss", styles::key_hint(palette)),
    ]));

    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 3,
        width: width.min(area.width),
        height,
    };

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.error))
        .padding(Padding::horizontal(1))
        .style(Style::default().bg(palette.bg_popup));
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        popup,
    );
}

fn truncate_with_ellipsis(raw: &str, max: usize) -> String {
    let max = max.max(3);
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(max - 3).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests;
