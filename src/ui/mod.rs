use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ansi;
use crate::app::{App, Popup, RowView};
use crate::panel::{self, PanelStatus};
use crate::theme::Theme;
use crate::trace::CallStatus;

// Load theme colors once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

fn accent() -> Color { theme().accent }
fn success() -> Color { theme().success }
fn danger() -> Color { theme().danger }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn inactive() -> Color { theme().inactive }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let status = PanelStatus::derive(
        app.player.is_playing(),
        app.trace.has_result_mismatch,
        app.trace.has_exception(),
    );

    let interaction_count = app.interaction_count();
    let caught = app.caught_exception();
    let unhandled = app.unhandled_errors();

    let show_banner = panel::show_discrepancy_banner(app.trace.has_result_mismatch);
    let show_controls = panel::show_controls_bar(interaction_count, app.trace.has_exception());
    let show_caught = panel::show_caught_exception(caught);
    let show_unhandled = panel::show_unhandled_errors(unhandled);
    let show_empty = panel::show_empty_state(app.player.is_playing(), caught, interaction_count);

    // Sections stack top to bottom; only the list is elastic.
    let mut constraints = Vec::new();
    if show_banner {
        constraints.push(Constraint::Length(1));
    }
    if show_controls {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Min(3)); // Interactions list / empty state
    let caught_height = caught
        .filter(|_| show_caught)
        .map(|e| block_height(&e.display_text(), area.height));
    if let Some(h) = caught_height {
        constraints.push(Constraint::Length(h));
    }
    let unhandled_height = unhandled.filter(|_| show_unhandled).map(|errors| {
        let body: usize = errors
            .iter()
            .map(|e| e.display_text().lines().count())
            .sum();
        // Header + description + one line per error line, capped.
        ((body as u16) + 3).min(area.height / 3).max(3)
    });
    if let Some(h) = unhandled_height {
        constraints.push(Constraint::Length(h));
    }
    constraints.push(Constraint::Length(1)); // Status line
    constraints.push(Constraint::Length(1)); // Footer

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut next = 0;
    if show_banner {
        draw_discrepancy_banner(f, status, chunks[next]);
        next += 1;
    }
    if show_controls {
        draw_controls_bar(f, app, status, chunks[next]);
        next += 1;
    }
    let list_area = chunks[next];
    next += 1;
    if show_empty {
        draw_empty_state(f, list_area);
    } else {
        draw_interactions_list(f, app, list_area);
    }
    if caught_height.is_some() {
        draw_caught_exception(f, app, chunks[next]);
        next += 1;
    }
    if unhandled_height.is_some() {
        draw_unhandled_errors(f, app, chunks[next]);
        next += 1;
    }
    draw_status_line(f, app, chunks[next]);
    draw_footer(f, chunks[next + 1]);

    if app.popup == Popup::Help {
        draw_help_popup(f);
    }
}

fn block_height(text: &str, total: u16) -> u16 {
    let lines = text.lines().count() as u16;
    (lines + 2).min(total / 3).max(3)
}

/// Banner warning that this run's results differ from the CLI run.
fn draw_discrepancy_banner(f: &mut Frame, status: PanelStatus, area: Rect) {
    let verdict = match status {
        PanelStatus::Error => "failing",
        _ => "passing",
    };
    let line = Line::from(vec![
        Span::styled("⚠ ", Style::default().fg(Color::Black)),
        Span::styled(
            format!(
                "This run is {verdict} here but the CLI recorded a different result"
            ),
            Style::default().fg(Color::Black),
        ),
    ]);
    let banner = Paragraph::new(line)
        .style(Style::default().bg(warning()))
        .alignment(Alignment::Center);
    f.render_widget(banner, area);
}

fn status_badge(status: PanelStatus) -> Span<'static> {
    let (label, color) = match status {
        PanelStatus::Active => (" RUNS ", accent()),
        PanelStatus::Error => (" FAIL ", danger()),
        PanelStatus::Done => (" PASS ", success()),
    };
    Span::styled(
        label,
        Style::default()
            .fg(Color::Black)
            .bg(color)
            .add_modifier(Modifier::BOLD),
    )
}

/// One key hint in the controls bar, dimmed when the control is disabled.
fn control_hint(key: &'static str, label: &'static str, enabled: bool) -> Vec<Span<'static>> {
    let key_style = if enabled {
        Style::default().fg(accent())
    } else {
        Style::default().fg(inactive())
    };
    let label_style = if enabled {
        Style::default().fg(text_dim())
    } else {
        Style::default().fg(inactive())
    };
    vec![
        Span::styled(key, key_style),
        Span::styled(format!(" {} │ ", label), label_style),
    ]
}

fn draw_controls_bar(f: &mut Frame, app: &App, status: PanelStatus, area: Rect) {
    let states = app.control_states();

    let mut spans = vec![status_badge(status), Span::raw(" ")];
    if let Some(name) = app.trace.file_name.as_deref() {
        spans.push(Span::styled(name.to_string(), Style::default().fg(text())));
        spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
    }
    spans.extend(control_hint("g", "start", states.start));
    spans.extend(control_hint("[", "back", states.back));
    spans.extend(control_hint("]", "next", states.next));
    spans.extend(control_hint("G", "end", states.end));
    spans.extend(control_hint("Enter", "goto", states.goto));
    spans.extend(control_hint("r", "rerun", states.rerun));
    spans.extend(control_hint("e", "newest", true));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn status_glyph(status: CallStatus) -> (&'static str, Color) {
    match status {
        CallStatus::Done => ("✓", success()),
        CallStatus::Error => ("✗", danger()),
        CallStatus::Active => ("▶", accent()),
        CallStatus::Waiting => ("○", text_dim()),
    }
}

fn interaction_line<'a>(row: &RowView<'a>, selected: bool, disabled: bool) -> Line<'a> {
    let (glyph, glyph_color) = status_glyph(row.status);

    let fold = if row.has_children {
        if row.collapsed { "▸ " } else { "▾ " }
    } else {
        "  "
    };

    let body_color = if disabled || row.status == CallStatus::Waiting {
        text_dim()
    } else {
        text()
    };

    let mut spans = vec![
        Span::raw("  ".repeat(row.depth)),
        Span::styled(glyph, Style::default().fg(glyph_color)),
        Span::raw(" "),
        Span::styled(fold, Style::default().fg(text_dim())),
        Span::styled(row.call.method.as_str(), Style::default().fg(body_color)),
    ];
    if !row.call.args.is_empty() {
        spans.push(Span::styled(
            format!("({})", row.call.args),
            Style::default().fg(text_dim()),
        ));
    }
    if row.paused_here {
        spans.push(Span::styled(
            "  ⏸ paused",
            Style::default().fg(warning()),
        ));
    }

    let mut line = Line::from(spans);
    if selected {
        line = line.style(Style::default().bg(bg_selected()));
    }
    line
}

fn draw_interactions_list(f: &mut Frame, app: &App, area: Rect) {
    let rows = app.rows();
    let height = area.height as usize;
    if height == 0 {
        return;
    }

    // Keep the selection in view; stateless window over the rows.
    let start = if app.selected >= height {
        app.selected + 1 - height
    } else {
        0
    };

    // Rows are inert while this run disagrees with the CLI run.
    let disabled = app.trace.has_result_mismatch;

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(start)
        .take(height)
        .map(|(i, row)| interaction_line(row, i == app.selected, disabled))
        .collect();

    f.render_widget(Paragraph::new(lines), area);
}

fn draw_empty_state(f: &mut Frame, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "No interactions found",
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Record a trace with your instrumented test run, then open it here.",
            Style::default().fg(text_dim()),
        )),
    ];
    let empty = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(empty, area);
}

fn draw_caught_exception(f: &mut Frame, app: &App, area: Rect) {
    let Some(error) = app.caught_exception() else {
        return;
    };

    let block = Block::default()
        .title(Span::styled(
            " Caught exception in play function ",
            Style::default().fg(danger()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::TOP)
        .border_style(Style::default().fg(danger()));

    let body = ansi::filter(&error.display_text());
    let paragraph = Paragraph::new(body).block(block).wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_unhandled_errors(f: &mut Frame, app: &App, area: Rect) {
    let Some(errors) = app.unhandled_errors() else {
        return;
    };

    let block = Block::default()
        .title(Span::styled(
            " Unhandled errors ",
            Style::default().fg(danger()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::TOP)
        .border_style(Style::default().fg(danger()));

    let mut lines = vec![Line::from(Span::styled(
        format!(
            "{} while running the play function. These can cause false positive assertions; \
             resolve them or set ignore_unhandled_errors in the config.",
            panel::unhandled_errors_header(errors.len())
        ),
        Style::default().fg(text()),
    ))];
    for error in errors {
        lines.push(Line::from(""));
        for filtered in ansi::filter(&error.display_text()).lines {
            lines.push(filtered);
        }
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.clone(), Style::default().fg(warning())))
    } else if app.player.is_playing() {
        Line::from(Span::styled(
            format!(
                "▶ Playing call {}/{}",
                (app.player.cursor() + 1).min(app.interaction_count()),
                app.interaction_count()
            ),
            Style::default().fg(accent()),
        ))
    } else if let Some(id) = app.player.paused_at() {
        Line::from(Span::styled(
            format!("⏸ Paused at {}", id),
            Style::default().fg(text_dim()),
        ))
    } else {
        Line::from(Span::styled("Ready", Style::default().fg(text_dim())))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let hints: &[(&str, &str)] = &[
        ("↑↓", "Nav"),
        ("Space", "Fold"),
        ("Enter", "Goto"),
        ("p", "Play"),
        ("f", "Follow"),
        ("h", "Help"),
        ("q", "Quit"),
    ];

    let max_hints = if area.width < 60 { 4 } else { hints.len() };

    let spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    f.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}

fn draw_help_popup(f: &mut Frame) {
    let popup_area = centered_rect(60, 70, f.area());

    f.render_widget(Clear, popup_area);

    let entry = |key: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), Style::default().fg(accent())),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Playback ═══",
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        )),
        entry("g / Home", "Jump to the first call"),
        entry("[ / ←", "Step back one call"),
        entry("] / →", "Step forward one call"),
        entry("G / End", "Jump past the last call"),
        entry("Enter", "Jump playback to the selected call"),
        entry("p", "Play / pause auto-stepping"),
        entry("r", "Rerun: reload the trace and replay"),
        Line::from(""),
        Line::from(Span::styled(
            "═══ List ═══",
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        )),
        entry("↑/↓ j/k", "Move selection"),
        entry("Space", "Fold / unfold child calls"),
        entry("e", "Jump to the newest call"),
        entry("f", "Toggle follow while playing"),
        Line::from(""),
        entry("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  Press h/?/Esc to close",
            Style::default().fg(text_dim()),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" tracepane Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
