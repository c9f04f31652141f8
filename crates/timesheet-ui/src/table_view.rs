//! Breakdown tables for the timesheet dashboard.
//!
//! Renders four bordered [`ratatui::widgets::Table`]s (top projects, top
//! employees, hours by client, hours by activity), each with a share column
//! and a highlighted totals row at the bottom.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use timesheet_core::formatting::{format_number, percentage};
use timesheet_core::models::AggregatedEntry;
use timesheet_data::analysis::{
    hours_by_activity, hours_by_client, top_employees, top_projects, DashboardMetrics,
};

use crate::themes::Theme;

/// Rows shown in the top-projects and top-employees tables.
pub const TOP_N: usize = 10;

const HOURS_WIDTH: u16 = 10;
const SHARE_WIDTH: u16 = 7;

/// One row of a breakdown table.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownRow {
    pub label: String,
    pub hours: f64,
}

/// Everything the dashboard body displays for the current filter.
#[derive(Debug, Clone, Default)]
pub struct DashboardViewData {
    pub metrics: DashboardMetrics,
    pub top_projects: Vec<BreakdownRow>,
    pub top_employees: Vec<BreakdownRow>,
    pub clients: Vec<BreakdownRow>,
    pub activities: Vec<BreakdownRow>,
    /// Duplicate candidates within the filtered rows.
    pub duplicate_count: usize,
}

impl DashboardViewData {
    pub fn from_entries(entries: &[AggregatedEntry], duplicate_count: usize) -> Self {
        let rows = |v: Vec<timesheet_data::analysis::LabeledHours>| {
            v.into_iter()
                .map(|r| BreakdownRow {
                    label: r.label,
                    hours: r.hours,
                })
                .collect::<Vec<_>>()
        };

        Self {
            metrics: DashboardMetrics::compute(entries),
            top_projects: top_projects(entries, TOP_N)
                .into_iter()
                .map(|p| BreakdownRow {
                    label: p.project_label,
                    hours: p.hours,
                })
                .collect(),
            top_employees: rows(top_employees(entries, TOP_N)),
            clients: rows(hours_by_client(entries)),
            activities: rows(hours_by_activity(entries)),
            duplicate_count,
        }
    }
}

/// Shorten `label` to at most `max_width` terminal columns, marking the cut
/// with `…`.
pub fn fit_label(label: &str, max_width: usize) -> String {
    if label.width() <= max_width {
        return label.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let budget = max_width - 1;
    let mut out = String::new();
    let mut used = 0;
    for c in label.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Render the four breakdown tables into `area` as a 2×2 grid.
pub fn render_dashboard_view(
    frame: &mut Frame,
    area: Rect,
    data: &DashboardViewData,
    theme: &Theme,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    let total = data.metrics.total_hours;
    render_breakdown(frame, top[0], "Top projects", &data.top_projects, total, theme);
    render_breakdown(frame, top[1], "Top employees", &data.top_employees, total, theme);
    render_breakdown(frame, bottom[0], "Hours by client", &data.clients, total, theme);
    render_breakdown(frame, bottom[1], "Hours by activity", &data.activities, total, theme);
}

/// Render one label / hours / share table with a totals row.
pub fn render_breakdown(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[BreakdownRow],
    total_hours: f64,
    theme: &Theme,
) {
    // borders + two column gaps
    let label_width = area
        .width
        .saturating_sub(2 + HOURS_WIDTH + SHARE_WIDTH + 2) as usize;

    let header = Row::new(
        ["Name", "Hours", "Share"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let mut all_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let share = percentage(row.hours, total_hours, 1);
            Row::new(vec![
                Cell::from(fit_label(&row.label, label_width)),
                Cell::from(format_number(row.hours, 1)),
                Cell::from(format!("{share:.1}%")).style(theme.share_style(share)),
            ])
            .style(theme.row_style(i))
        })
        .collect();

    let shown: f64 = rows.iter().map(|r| r.hours).sum();
    all_rows.push(
        Row::new(vec![
            Cell::from(format!("TOTAL ({} rows)", rows.len())),
            Cell::from(format_number(shown, 1)),
            Cell::from(format!("{:.1}%", percentage(shown, total_hours, 1))),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Min(8),
        Constraint::Length(HOURS_WIDTH),
        Constraint::Length(SHARE_WIDTH),
    ];

    let table = Table::new(all_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render a placeholder when there is nothing to show, with `message` as the
/// reason.
pub fn render_no_data(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Press 'a' to clear the filters or 'r' to reload the source.",
            theme.dim,
        )),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Timesheet Dashboard "),
        ),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
