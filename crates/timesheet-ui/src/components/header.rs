use crate::themes::Theme;
use ratatui::text::{Line, Span};
use timesheet_core::formatting::{format_hours, format_number};
use timesheet_data::analysis::DashboardMetrics;

/// Title shown on the first header line.
pub const TITLE: &str = "TIMESHEET DASHBOARD";

/// Dashboard header rendering four lines:
///
/// 1. Title and source file name.
/// 2. A 60-column `=` separator.
/// 3. KPI line: total hours, active projects, employees, top project, average.
/// 4. An empty line.
pub struct Header<'a> {
    /// Display name of the source file.
    pub source: &'a str,
    pub metrics: &'a DashboardMetrics,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(source: &'a str, metrics: &'a DashboardMetrics, theme: &'a Theme) -> Self {
        Self {
            source,
            metrics,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let separator = "=".repeat(60);

        vec![
            Line::from(vec![
                Span::styled(TITLE, self.theme.header),
                Span::styled("  [ ", self.theme.label),
                Span::styled(self.source, self.theme.value),
                Span::styled(" ]", self.theme.label),
            ]),
            Line::from(Span::styled(separator, self.theme.separator)),
            self.kpi_line(),
            Line::from(""),
        ]
    }

    fn kpi_line(&self) -> Line<'a> {
        let m = self.metrics;
        let top = m
            .top_project
            .as_ref()
            .map(|p| p.project_no.clone())
            .unwrap_or_else(|| "n/a".to_string());

        let mut spans = Vec::with_capacity(10);
        for (i, (label, value)) in [
            ("Total", format_hours(m.total_hours)),
            ("Projects", m.active_projects.to_string()),
            ("Employees", m.active_employees.to_string()),
            ("Top", top),
            ("Avg/employee", format_number(m.avg_hours_per_employee, 1)),
        ]
        .into_iter()
        .enumerate()
        {
            let prefix = if i == 0 {
                format!("{label}: ")
            } else {
                format!("  {label}: ")
            };
            spans.push(Span::styled(prefix, self.theme.label));
            spans.push(Span::styled(value, self.theme.value));
        }
        Line::from(spans)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
