use itertools::Itertools;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use crate::session::DraftField;
use crate::settings::SettingsKey;
use crate::{util, App};

/// History page: filter line, session table and the add/edit dialog overlay.
pub fn render(app: &mut App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(1)
        .constraints([
            Constraint::Length(1), // filters
            Constraint::Min(3),    // table
            Constraint::Length(1), // legend
        ])
        .split(area);

    let days_label = match app.history.days {
        Some(days) => format!("Last {} days", days),
        None => "All time".to_string(),
    };
    let collections = std::iter::once("All collections".to_string())
        .chain(
            app.settings
                .list(SettingsKey::Collections)
                .iter()
                .cloned(),
        )
        .collect_vec();
    let collection_label = collections
        .get(app.history.collection_idx)
        .cloned()
        .unwrap_or_else(|| "All collections".to_string());

    let filters = Paragraph::new(Span::styled(
        format!(
            "{} | {} | {} records",
            days_label,
            collection_label,
            app.history.rows.len()
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    f.render_widget(filters, chunks[0]);

    if !app.history.rows.is_empty() && app.history.selected >= app.history.rows.len() {
        app.history.selected = app.history.rows.len() - 1;
    }

    let table_height = chunks[1].height.saturating_sub(3) as usize;
    let offset = app
        .history
        .selected
        .saturating_sub(table_height.saturating_sub(1));

    let header = Row::new(vec![
        " ", "Date", "Start", "Min", "Collection", "Piece", "Section", "BPM", "Type", "P", "Notes",
    ])
    .style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .history
        .rows
        .iter()
        .enumerate()
        .skip(offset)
        .take(table_height)
        .map(|(i, session)| {
            let marked = session
                .id
                .map(|id| app.history.marked.contains(&id))
                .unwrap_or(false);
            let style = if i == app.history.selected {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(if marked { "x" } else { " " }),
                Cell::from(session.date.clone()),
                Cell::from(session.start_time.clone()),
                Cell::from(util::whole_minutes(session.duration_secs).to_string()),
                Cell::from(session.collection.clone()),
                Cell::from(session.piece.clone()),
                Cell::from(session.section.clone()),
                Cell::from(session.bpm.clone()),
                Cell::from(session.practice_type.clone()),
                Cell::from(session.pause_count.to_string()),
                Cell::from(util::truncate_notes(&session.notes, 24)),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        &[
            Constraint::Length(1),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(4),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(5),
            Constraint::Length(13),
            Constraint::Length(2),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("History"));
    f.render_widget(table, chunks[1]);

    let legend = Paragraph::new(Span::styled(
        "(space) mark / (a)dd / (e)dit / (x) delete / (d)ays / (c)ollection / (w)rite csv",
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[2]);

    if app.history.dialog.is_some() {
        render_dialog(app, f, area);
    }
}

fn render_dialog(app: &App, f: &mut Frame, area: Rect) {
    let Some(dialog) = &app.history.dialog else {
        return;
    };

    let rect = super::centered_rect(48, DraftField::DIALOG_FIELDS.len() as u16 + 4, area);
    f.render_widget(Clear, rect);
    let title = if dialog.editing_id.is_some() {
        "Edit record"
    } else {
        "Add record"
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let mut lines: Vec<Line> = DraftField::DIALOG_FIELDS
        .iter()
        .enumerate()
        .map(|(i, &field)| {
            let focused = i == dialog.focus;
            let value = dialog.draft.field(field);
            let shown = if field == DraftField::PracticeType {
                format!("< {} >", value)
            } else if focused && dialog.editing {
                format!("{}\u{258f}", value)
            } else {
                value.to_string()
            };
            let label_style = if focused {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:<10}", field.to_string()), label_style),
                Span::raw(shown),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "(enter) edit field / (s)ave / (esc) cancel",
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(lines), inner);
}
