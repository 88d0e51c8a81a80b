//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod input;
mod output;
mod status;
mod tabs;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
};

use crate::app::{App, MAX_INPUT_LINES};

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App) {
    const STATUS_HEIGHT: u16 = 1;
    const TABS_HEIGHT: u16 = 1;
    const OUTPUT_MIN_HEIGHT: u16 = 3;
    const INPUT_BORDER: u16 = 2;

    let input_lines = app.input().lines().len().clamp(1, MAX_INPUT_LINES) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(TABS_HEIGHT),
            Constraint::Min(OUTPUT_MIN_HEIGHT),
            Constraint::Length(input_lines + INPUT_BORDER),
        ])
        .split(frame.area());

    let [status_area, tabs_area, output_area, input_area] = chunks.as_ref() else {
        return;
    };

    status::render(frame, app, *status_area);
    tabs::render(frame, app, *tabs_area);
    output::render(frame, app, *output_area);
    input::render(frame, app, *input_area);
}
