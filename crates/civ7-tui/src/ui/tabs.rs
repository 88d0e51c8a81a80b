//! Tab bar

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Tabs,
};

use crate::app::App;

/// Render the tab bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<String> = app.tabs().iter().map(|tab| tab.name.clone()).collect();

    let tabs = Tabs::new(titles)
        .select(app.active_index())
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .divider("|");

    frame.render_widget(tabs, area);
}
