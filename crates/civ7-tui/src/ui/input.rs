//! Input box
//!
//! Displays the editor lines with a prompt and places the cursor.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;

const PROMPT: &str = "> ";
const CONTINUATION: &str = "… ";
const PROMPT_WIDTH: u16 = 2;
const BORDER: u16 = 1;

/// Render the input box.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let input = app.input();

    let lines: Vec<Line> = input
        .lines()
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let prompt = if i == 0 { PROMPT } else { CONTINUATION };
            Line::raw(format!("{prompt}{line}"))
        })
        .collect();

    let block = Block::default().borders(Borders::ALL);
    let paragraph = Paragraph::new(lines).style(Style::default().fg(Color::White)).block(block);
    frame.render_widget(paragraph, area);

    let (row, col) = input.cursor();
    let max_x = area.x.saturating_add(area.width).saturating_sub(BORDER + 1);
    let cursor_x = area
        .x
        .saturating_add(BORDER + PROMPT_WIDTH)
        .saturating_add(col as u16)
        .min(max_x);
    let cursor_y = area.y.saturating_add(BORDER).saturating_add(row as u16);

    frame.set_cursor_position((cursor_x, cursor_y));
}
