pub mod charting;
pub mod history;
pub mod settings_view;
pub mod stats_view;
pub mod timer;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{App, Confirm, Page, TextPrompt};

/// Top-level frame: navigation tabs, the active page, the status line and
/// any modal overlay.
pub fn render(app: &mut App, f: &mut Frame) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_nav(app, f, chunks[0]);
    match app.page {
        Page::Timer => timer::render(app, f, chunks[1]),
        Page::History => history::render(app, f, chunks[1]),
        Page::Stats => stats_view::render(app, f, chunks[1]),
        Page::Settings => settings_view::render(app, f, chunks[1]),
    }
    render_status(app, f, chunks[2]);

    if let Some(prompt) = &app.prompt {
        render_prompt(prompt, f, area);
    }
    if let Some(confirm) = &app.confirm {
        render_confirm(confirm, f, area);
    }
}

fn render_nav(app: &App, f: &mut Frame, area: Rect) {
    let titles: Vec<String> = Page::ALL.iter().map(|p| p.to_string()).collect();
    let tabs = Tabs::new(titles)
        .select(app.page.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider("|");
    f.render_widget(tabs, area);
}

fn render_status(app: &App, f: &mut Frame, area: Rect) {
    let line = match &app.status {
        Some(status) => Span::styled(
            status.text.clone(),
            if status.error {
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Green)
            },
        ),
        None => Span::styled(
            "(1) timer  (2) history  (3) stats  (4) settings",
            Style::default().fg(Color::Gray).add_modifier(Modifier::DIM),
        ),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_prompt(prompt: &TextPrompt, f: &mut Frame, area: Rect) {
    let rect = centered_rect(50, 3, area);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(prompt.title.clone());
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    // Keep the tail of a long value visible while typing
    let inner_width = inner.width.saturating_sub(1) as usize;
    let mut text = prompt.buffer.as_str();
    while text.width() > inner_width {
        let mut chars = text.chars();
        chars.next();
        text = chars.as_str();
    }
    let input = Paragraph::new(format!("{}\u{258f}", text));
    f.render_widget(input, inner);
}

fn render_confirm(confirm: &Confirm, f: &mut Frame, area: Rect) {
    let rect = centered_rect(54, 4, area);
    f.render_widget(Clear, rect);
    let block = Block::default().borders(Borders::ALL).title("Confirm");
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let lines = vec![
        ratatui::text::Line::from(confirm.message.clone()),
        ratatui::text::Line::from(Span::styled(
            "(y)es / (n)o",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

/// A centered rect of the given size, clamped to the surrounding area.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::session::DraftField;
    use crate::settings::SettingsKey;
    use crate::store::Db;
    use crate::{ConfirmAction, PromptPurpose, RecordDialog};
    use ratatui::{backend::TestBackend, Terminal};

    fn test_app() -> App {
        App::new(Db::open_in_memory().unwrap(), Config::default()).unwrap()
    }

    fn draw_to_string(app: &mut App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render(app, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn renders_timer_page() {
        let mut app = test_app();
        let content = draw_to_string(&mut app);
        assert!(content.contains("00:00:00"));
        assert!(content.contains("Collection"));
        assert!(content.contains("No sessions recorded yet"));
    }

    #[test]
    fn renders_history_page() {
        let mut app = test_app();
        app.show_page(Page::History);
        let content = draw_to_string(&mut app);
        assert!(content.contains("History"));
        assert!(content.contains("Last 7 days"));
        assert!(content.contains("All collections"));
    }

    #[test]
    fn renders_stats_page() {
        let mut app = test_app();
        app.show_page(Page::Stats);
        let content = draw_to_string(&mut app);
        assert!(content.contains("Streak"));
        assert!(content.contains("Minutes per day"));
        assert!(content.contains("Practice types"));
    }

    #[test]
    fn renders_settings_page() {
        let mut app = test_app();
        app.show_page(Page::Settings);
        let content = draw_to_string(&mut app);
        assert!(content.contains("Collections"));
        assert!(content.contains("Practice types"));
        assert!(content.contains("Czerny 599"));
    }

    #[test]
    fn renders_record_dialog_overlay() {
        let mut app = test_app();
        app.show_page(Page::History);
        app.history.dialog = Some(RecordDialog {
            draft: crate::session::SessionDraft::new_for_today(),
            editing_id: None,
            focus: 0,
            editing: false,
        });
        let content = draw_to_string(&mut app);
        assert!(content.contains("Add record"));
        assert!(content.contains(&DraftField::DurationMin.to_string()));
    }

    #[test]
    fn renders_prompt_overlay() {
        let mut app = test_app();
        app.prompt = Some(TextPrompt {
            title: "Rename entry".to_string(),
            buffer: "Czerny 849".to_string(),
            purpose: PromptPurpose::RenameEntry(SettingsKey::Collections, 0),
        });
        let content = draw_to_string(&mut app);
        assert!(content.contains("Rename entry"));
        assert!(content.contains("Czerny 849"));
    }

    #[test]
    fn renders_confirm_overlay() {
        let mut app = test_app();
        app.confirm = Some(Confirm {
            message: "Delete 2 record(s)?".to_string(),
            action: ConfirmAction::DeleteSessions(vec![1, 2]),
        });
        let content = draw_to_string(&mut app);
        assert!(content.contains("Delete 2 record(s)?"));
        assert!(content.contains("(y)es / (n)o"));
    }

    #[test]
    fn status_line_shows_errors() {
        let mut app = test_app();
        app.error("Please fill in collection".to_string());
        let content = draw_to_string(&mut app);
        assert!(content.contains("Please fill in collection"));
    }

    #[test]
    fn centered_rect_clamps_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        let rect = centered_rect(50, 50, area);
        assert!(rect.width <= area.width);
        assert!(rect.height <= area.height);
        let small = centered_rect(10, 4, area);
        assert_eq!(small.x, 5);
        assert_eq!(small.y, 3);
    }
}
