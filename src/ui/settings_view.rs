use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::settings::SettingsKey;
use crate::App;

/// Settings page: one column per option list, cursor in the active one.
pub fn render(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(1)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(chunks[0]);

    for (idx, &key) in SettingsKey::ALL.iter().enumerate() {
        let active = idx == app.settings_list;
        let border_style = if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let lines: Vec<Line> = app
            .settings
            .list(key)
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let style = if active && i == app.settings_entry {
                    Style::default()
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(entry.clone(), style))
            })
            .collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(key.to_string())
            .border_style(border_style);
        f.render_widget(Paragraph::new(lines).block(block), columns[idx]);
    }

    let legend = Paragraph::new(Span::styled(
        "left/right list / up/down entry / shift+up/down move / (a)dd / (r)ename / (x) delete / (e)xport / (i)mport",
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[1]);
}
