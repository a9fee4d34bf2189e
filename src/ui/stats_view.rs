use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::{Axis, BarChart, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::ui::charting;
use crate::{util, App};

/// Stats page: summary cards, the duration trend and the type distribution.
pub fn render(app: &App, f: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(1)
        .constraints([
            Constraint::Length(3), // cards
            Constraint::Min(5),    // charts
            Constraint::Length(1), // legend
        ])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(chunks[0]);

    let view = &app.stats_view;
    render_card(
        f,
        cards[0],
        "Today",
        &format!(
            "{} min, {} sessions",
            util::whole_minutes(view.today.duration_secs),
            view.today.count
        ),
    );
    render_card(
        f,
        cards[1],
        &format!("Total ({}d)", view.days),
        &format!("{} h", util::format_hours(view.period.total_duration_secs)),
    );
    render_card(
        f,
        cards[2],
        "Sessions",
        &format!("{} ({} avg pauses)", view.period.total_count, view.period.avg_pause),
    );
    render_card(
        f,
        cards[3],
        "Streak",
        &format!("{} days", view.period.consecutive_days),
    );

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    render_trend(app, f, charts[0]);
    render_distribution(app, f, charts[1]);

    let legend = Paragraph::new(Span::styled(
        "(d) change period / (tab) next page / (esc)ape",
        Style::default()
            .fg(Color::Gray)
            .add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(legend, chunks[2]);
}

fn render_card(f: &mut Frame, area: Rect, title: &str, value: &str) {
    let card = Paragraph::new(Span::styled(
        value.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    f.render_widget(card, area);
}

fn render_trend(app: &App, f: &mut Frame, area: Rect) {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let tuples: Vec<(f64, f64)> = app.stats_view.trend.iter().map(|&p| p.into()).collect();
    let (last_day, highest_minutes) = charting::trend_bounds(&tuples, app.stats_view.days);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&tuples)];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title("Minutes per day"))
        .x_axis(
            Axis::default()
                .title("day")
                .bounds([0.0, last_day])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(last_day), bold_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("min")
                .bounds([0.0, highest_minutes])
                .labels(vec![
                    Span::styled("0", bold_style),
                    Span::styled(charting::format_label(highest_minutes), bold_style),
                ]),
        );
    f.render_widget(chart, area);
}

fn render_distribution(app: &App, f: &mut Frame, area: Rect) {
    let labels: Vec<String> = app
        .stats_view
        .shares
        .iter()
        .map(|share| {
            let short: String = share.practice_type.chars().take(6).collect();
            format!("{} {}%", short, share.percent)
        })
        .collect();
    let data: Vec<(&str, u64)> = labels
        .iter()
        .zip(&app.stats_view.shares)
        .map(|(label, share)| (label.as_str(), share.count))
        .collect();

    let chart = BarChart::default()
        .block(Block::default().borders(Borders::ALL).title("Practice types"))
        .data(data.as_slice())
        .bar_width(12)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, area);
}
