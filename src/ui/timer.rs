use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::time::Duration;
use time_humanize::{Accuracy, HumanTime, Tense};

use crate::session::{DraftField, TimerPhase};
use crate::{util, App};

/// Timer page: today's tally, the running clock and the session form.
pub fn render(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(2)
        .vertical_margin(1)
        .constraints([
            Constraint::Length(1), // today summary
            Constraint::Length(1), // last practiced
            Constraint::Length(1), // spacer
            Constraint::Length(1), // clock
            Constraint::Length(1), // phase
            Constraint::Length(1), // spacer
            Constraint::Length(DraftField::TIMER_FIELDS.len() as u16),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let today = Paragraph::new(Span::styled(
        format!(
            "Today: {} sessions, {} min practiced",
            app.today.count,
            util::whole_minutes(app.today.duration_secs)
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ));
    f.render_widget(today, chunks[0]);

    let last = Paragraph::new(Span::styled(
        last_practiced_line(app),
        Style::default().fg(Color::Gray),
    ));
    f.render_widget(last, chunks[1]);

    let clock_style = match app.timer.phase {
        TimerPhase::Running => Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
        TimerPhase::Paused => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        TimerPhase::Idle => Style::default()
            .add_modifier(Modifier::BOLD | Modifier::DIM),
    };
    let clock = Paragraph::new(Span::styled(
        util::format_hms(app.timer.elapsed_secs),
        clock_style,
    ))
    .alignment(Alignment::Center);
    f.render_widget(clock, chunks[3]);

    let phase_text = match app.timer.phase {
        TimerPhase::Idle => "Ready".to_string(),
        TimerPhase::Running => format!("Recording ({} pauses)", app.timer.pause_count),
        TimerPhase::Paused => format!("PAUSED ({} pauses)", app.timer.pause_count),
    };
    let phase = Paragraph::new(Span::styled(
        phase_text,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center);
    f.render_widget(phase, chunks[4]);

    let form = Paragraph::new(form_lines(app));
    f.render_widget(form, chunks[6]);

    let legend_text = if app.timer.is_idle() {
        "(s)tart / (enter) edit field / (tab) next page / (esc)ape"
    } else {
        "(p)ause/resume / (f)inish and save / (tab) next page / (esc)ape"
    };
    let legend = Paragraph::new(Span::styled(
        legend_text,
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[8]);
}

fn last_practiced_line(app: &App) -> String {
    match app.last_practiced {
        Some(end) => {
            let secs = (chrono::Local::now() - end).num_seconds().max(0) as u64;
            format!(
                "Last practiced {}",
                HumanTime::from(Duration::from_secs(secs)).to_text_en(Accuracy::Rough, Tense::Past)
            )
        }
        None => "No sessions recorded yet".to_string(),
    }
}

fn form_lines(app: &App) -> Vec<Line<'static>> {
    DraftField::TIMER_FIELDS
        .iter()
        .enumerate()
        .map(|(i, &field)| {
            let focused = i == app.timer_focus;
            let value = app.draft.field(field);
            let shown = if field == DraftField::PracticeType {
                format!("< {} >", value)
            } else if focused && app.editing {
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
            let value_style = if focused {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("{:<12}", field.to_string()), label_style),
                Span::styled(shown, value_style),
            ])
        })
        .collect()
}
