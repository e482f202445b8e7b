//! Rendering for the chat overlay.
//!
//! One host view (header, status line, key hints) with a floating chat
//! window anchored bottom-right when open, in the spirit of a web chat
//! widget overlaying its host page.

use chirp_types::Sender;
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};

use crate::app::App;
use crate::theme::{THROBBER_FRAMES, tone_color};

pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let [header, body, status, footer] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1), Constraint::Length(1)])
            .areas(area);

    frame.render_widget(
        Paragraph::new("chirp").style(Style::default().add_modifier(Modifier::BOLD)).centered(),
        header,
    );
    frame.render_widget(Paragraph::new(entry_hint(app)).centered(), body);
    frame.render_widget(Paragraph::new(status_line(app)), status);
    frame.render_widget(
        Paragraph::new("c: chat  y: copy last reply  Esc: close  Ctrl+C: quit")
            .style(Style::default().fg(Color::DarkGray)),
        footer,
    );

    if app.chat_open {
        draw_chat_window(frame, area, app);
    }
}

/// The chat entry point: advertised when the backend is healthy, replaced by
/// the current status message otherwise.
fn entry_hint(app: &App) -> Line<'_> {
    if app.chat_open {
        Line::from("")
    } else if app.chat_enabled() {
        Line::from(Span::styled(
            "💬  Press c to chat",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(Span::styled(
            format!("Chat unavailable: {}", app.health.message),
            Style::default().fg(Color::DarkGray),
        ))
    }
}

fn status_line(app: &App) -> Line<'_> {
    let color = tone_color(app.health.status.tone());
    let mut spans = vec![
        Span::styled("● ", Style::default().fg(color)),
        Span::styled(app.health.status.label(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
        Span::raw(" — "),
        Span::raw(app.health.message.as_str()),
    ];
    if app.executing {
        let frame = THROBBER_FRAMES[app.throbber_idx % THROBBER_FRAMES.len()];
        spans.push(Span::raw("  "));
        spans.push(Span::styled(frame, Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

fn draw_chat_window(frame: &mut Frame, host: Rect, app: &App) {
    let width = host.width.saturating_sub(4).min(48);
    let height = host.height.saturating_sub(3).min(20);
    if width < 10 || height < 5 {
        return;
    }
    let window = Rect {
        x: host.right().saturating_sub(width + 2),
        y: host.bottom().saturating_sub(height + 2),
        width,
        height,
    };

    frame.render_widget(Clear, window);
    let block = Block::bordered().title(" Chat with us ");
    let inner = block.inner(window);
    frame.render_widget(block, window);

    let [transcript_area, input_area] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

    frame.render_widget(
        Paragraph::new(transcript_lines(app))
            .wrap(Wrap { trim: false })
            .scroll((transcript_scroll(app, transcript_area), 0)),
        transcript_area,
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(app.input.as_str()),
            Span::styled("▏", Style::default().fg(Color::DarkGray)),
        ])),
        input_area,
    );
}

fn transcript_lines(app: &App) -> Vec<Line<'_>> {
    app.messages
        .iter()
        .map(|message| {
            let (prefix, style) = match message.sender {
                Sender::User => ("you ", Style::default().fg(Color::Cyan)),
                Sender::Bot => ("bot ", Style::default().fg(Color::Green)),
            };
            Line::from(vec![
                Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
                Span::raw(message.text.as_str()),
            ])
        })
        .collect()
}

/// Keep the newest messages visible; wrapped lines make this approximate but
/// it only ever errs toward showing recent history.
fn transcript_scroll(app: &App, area: Rect) -> u16 {
    let lines = app.messages.len() as u16;
    lines.saturating_sub(area.height)
}
