//! Status bar
//!
//! Title, connection indicator with retry countdown, and endpoint.

use civ7_core::ConnectionState;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::App;

const TITLE: &str = " Civ7 Debug Terminal ";

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.status();

    let indicator = match status.connection_state {
        ConnectionState::Connected => {
            let text = if app.is_awaiting() { "[●] running" } else { "[●]" };
            Span::styled(text, Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        },
        ConnectionState::Connecting => Span::styled("[◐]", Style::default().fg(Color::Yellow)),
        ConnectionState::Reconnecting => {
            let text = match status.retry_in {
                Some(delay) if delay.as_secs() > 0 => format!("[○] retry in {}s", delay.as_secs()),
                _ => "[○]".to_string(),
            };
            Span::styled(text, Style::default().fg(Color::Red))
        },
        ConnectionState::Disconnected | ConnectionState::Closed => {
            Span::styled("[○]", Style::default().fg(Color::Red))
        },
    };

    let detail = status
        .last_error
        .as_ref()
        .filter(|_| status.connection_state != ConnectionState::Connected)
        .map_or_else(String::new, |error| format!(" ({error})"));

    let line = Line::from(vec![
        Span::styled(TITLE, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        indicator,
        Span::styled(detail, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(app.endpoint().to_string(), Style::default().fg(Color::Gray)),
    ]);

    let paragraph =
        Paragraph::new(line).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
