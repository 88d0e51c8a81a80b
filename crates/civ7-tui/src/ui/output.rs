//! Output area
//!
//! Displays the active tab's commands, results and notices, coloured by
//! kind, scrolled to the bottom unless the user paged up.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, LineKind};

const BORDER_SIZE: u16 = 2;

fn style_for(kind: LineKind) -> Style {
    match kind {
        LineKind::Command | LineKind::Continuation => Style::default().fg(Color::Cyan),
        LineKind::Response => Style::default().fg(Color::Green),
        LineKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        LineKind::Info => Style::default().fg(Color::Yellow),
    }
}

/// Render the output area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(tab) = app.active_tab() else {
        return;
    };

    let title = if tab.scroll > 0 {
        format!(" {} (+{} below) ", tab.name, tab.scroll)
    } else {
        format!(" {} ", tab.name)
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let end = tab.lines.len().saturating_sub(tab.scroll);
    let start = end.saturating_sub(visible_height);

    let lines: Vec<Line> = tab.lines[start..end]
        .iter()
        .map(|line| Line::styled(line.display(), style_for(line.kind)))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
