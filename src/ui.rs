//! Terminal user interface with ratatui.
//!
//! Records table on top, the chart of the selected metric underneath.

use crate::app::App;
use crate::chart::ChartSeries;
use crate::models::ValuationRecord;
use crate::view::ViewState;
use num_format::{Locale, ToFormattedString};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table,
        TableState, Wrap,
    },
};

/// Colors for the UI.
pub struct UiColors {
    pub line: Color,
    pub muted: Color,
    pub header_bg: Color,
    pub selected_bg: Color,
    pub border: Color,
    pub error: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            line: Color::Rgb(13, 110, 253),
            muted: Color::DarkGray,
            header_bg: Color::DarkGray,
            selected_bg: Color::Rgb(40, 40, 60),
            border: Color::DarkGray,
            error: Color::Red,
        }
    }
}

/// Render the main UI.
pub fn render(frame: &mut Frame, app: &App, view: &ViewState) {
    let colors = UiColors::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // Header
            Constraint::Percentage(45), // Records
            Constraint::Min(8),         // Chart
            Constraint::Length(1),      // Footer
        ])
        .split(frame.area());

    render_header(frame, app, view, chunks[0], &colors);
    render_records_table(frame, app, view, chunks[1], &colors);
    render_chart(frame, view, chunks[2], &colors);
    render_footer(frame, view, chunks[3], &colors);

    if view.show_help {
        render_help_overlay(frame, &colors);
    }

    if let Some(ref error) = view.error {
        render_error(frame, error, &colors);
    }
}

/// Render the header with the current filter and metric.
fn render_header(frame: &mut Frame, app: &App, view: &ViewState, area: Rect, colors: &UiColors) {
    let filter = match view.ticker_filter() {
        Some(ticker) => {
            let name = app.store().stock(ticker).map(|s| s.name.as_str()).unwrap_or("");
            format!("{} {}", ticker, name)
        }
        None => "All tickers".to_string(),
    };

    let mut second = vec![
        Span::raw(format!("{} stocks  ", app.store().stocks().len())),
        Span::raw(format!("{} records shown  ", view.records(app).len())),
        Span::raw(format!("Chart: {}", view.metric.label())),
    ];
    if let Some(ref status) = view.status {
        second.push(Span::styled(format!("  {}", status), Style::default().fg(Color::Yellow)));
    }

    let header_text = vec![
        Line::from(vec![
            Span::styled(
                "STONKLOG ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("- {}", filter)),
        ]),
        Line::from(second),
    ];

    let header = Paragraph::new(header_text).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

/// Render the records table.
fn render_records_table(frame: &mut Frame, app: &App, view: &ViewState, area: Rect, colors: &UiColors) {
    let header_cells = ["DATE", "TICKER", "PRICE", "EPS", "MODE", "PER", "PBR", "MEMO"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::White)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(colors.header_bg))
        .height(1);

    let records = view.records(app);
    let rows = records.iter().enumerate().map(|(i, record)| {
        let row_style = if i == view.selected {
            Style::default().bg(colors.selected_bg)
        } else {
            Style::default()
        };

        let per_style = if record.per.is_some() {
            Style::default()
        } else {
            Style::default().fg(colors.muted)
        };

        let cells = vec![
            Cell::from(record.date.to_string()),
            Cell::from(record.ticker.clone()),
            Cell::from(format_price(record.price)),
            Cell::from(format_ratio(record.eps_used)),
            Cell::from(record.eps_mode.to_string()),
            Cell::from(format_ratio(record.per)).style(per_style),
            Cell::from(format_ratio(record.pbr)),
            Cell::from(truncate_string(&record.memo, 30)),
        ];

        Row::new(cells).style(row_style)
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::NONE))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = TableState::default();
    if !records.is_empty() {
        state.select(Some(view.selected));
    }

    frame.render_stateful_widget(table, area, &mut state);
}

/// Render the chart for the current series.
fn render_chart(frame: &mut Frame, view: &ViewState, area: Rect, colors: &UiColors) {
    let block = Block::default()
        .title(format!(" {} ", view.metric.label()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border));

    let Some(series) = view.chart.current().filter(|s| !s.is_empty()) else {
        let empty = Paragraph::new("No data to chart for this metric.")
            .style(Style::default().fg(colors.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let points = series.points();
    let datasets = vec![
        Dataset::default()
            .name(series.metric.label())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(colors.line))
            .data(&points),
    ];

    let [y_min, y_max] = series.y_bounds();
    let x_max = (series.values.len().saturating_sub(1)).max(1) as f64;

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(colors.muted))
                .bounds([0.0, x_max])
                .labels(x_labels(series)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(colors.muted))
                .bounds([y_min, y_max])
                .labels(vec![format!("{:.2}", y_min), format!("{:.2}", y_max)]),
        );

    frame.render_widget(chart, area);
}

/// First and last point labels.
fn x_labels(series: &ChartSeries) -> Vec<String> {
    match (series.labels.first(), series.labels.last()) {
        (Some(first), Some(last)) if series.labels.len() > 1 => vec![first.clone(), last.clone()],
        (Some(only), _) => vec![only.clone()],
        _ => Vec::new(),
    }
}

/// Render the footer with keybindings.
fn render_footer(frame: &mut Frame, view: &ViewState, area: Rect, colors: &UiColors) {
    let mut spans = vec![
        Span::styled(" q", Style::default().fg(Color::Yellow)),
        Span::raw(":quit "),
        Span::styled("h", Style::default().fg(Color::Yellow)),
        Span::raw(":help "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(":ticker "),
        Span::styled("m", Style::default().fg(Color::Yellow)),
        Span::raw(":metric "),
    ];
    if !view.read_only {
        spans.push(Span::styled("x", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(":delete "));
    }
    spans.push(Span::raw(format!(
        "| {} | {}",
        view.ticker_filter().unwrap_or("all"),
        view.metric.label()
    )));

    let footer_widget = Paragraph::new(Line::from(spans)).style(Style::default().bg(colors.header_bg));

    frame.render_widget(footer_widget, area);
}

/// Render help overlay.
fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 60, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "STONKLOG HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  ↑/k       Move up"),
        Line::from("  ↓/j       Move down"),
        Line::from("  g/Home    Go to top"),
        Line::from("  G/End     Go to bottom"),
        Line::from(""),
        Line::from("Display:"),
        Line::from("  Tab       Cycle ticker filter"),
        Line::from("  m         Cycle charted metric"),
        Line::from(""),
        Line::from("Actions:"),
        Line::from("  x         Delete selected record"),
        Line::from("  q/Esc     Quit"),
        Line::from("  h/?       Toggle help"),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

/// Render error message.
fn render_error(frame: &mut Frame, error: &str, colors: &UiColors) {
    let area = centered_rect(50, 20, frame.area());

    let error_widget = Paragraph::new(error)
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.error)),
        )
        .style(Style::default().fg(colors.error))
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(error_widget, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Format a price with thousands separators and two decimals.
pub fn format_price(price: f64) -> String {
    let cents = (price * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!(
        "{}{}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Format an optional ratio, `-` when not computable.
pub fn format_ratio(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

/// Truncate string to max length.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

fn batch_row(record: &ValuationRecord) -> String {
    format!(
        "{:<12} {:<8} {:>12} {:>10} {:<10} {:>8} {:>8}  {}",
        record.date.to_string(),
        record.ticker,
        format_price(record.price),
        format_ratio(record.eps_used),
        record.eps_mode.to_string(),
        format_ratio(record.per),
        format_ratio(record.pbr),
        truncate_string(&record.memo, 30)
    )
}

/// Render batch mode output (non-interactive).
pub fn render_batch(app: &App, view: &ViewState) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== STONKLOG {} | {} ===\n",
        view.ticker_filter().unwrap_or("all"),
        view.metric.label()
    ));
    out.push_str(&format!(
        "{:<12} {:<8} {:>12} {:>10} {:<10} {:>8} {:>8}  {}\n",
        "DATE", "TICKER", "PRICE", "EPS", "MODE", "PER", "PBR", "MEMO"
    ));
    out.push_str(&"-".repeat(90));
    out.push('\n');

    let records = view.records(app);
    if records.is_empty() {
        out.push_str("No records yet.\n");
    }
    for record in &records {
        out.push_str(&batch_row(record));
        out.push('\n');
    }

    out.push_str(&format!("\n{} series:\n", view.metric.label()));
    match view.chart.current().filter(|s| !s.is_empty()) {
        Some(series) => {
            for (label, value) in series.labels.iter().zip(&series.values) {
                out.push_str(&format!("  {:<24} {:>12.2}\n", label, value));
            }
        }
        None => out.push_str("  (no data)\n"),
    }

    out
}
