//! CSV and HTML artifacts.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Local};
use timesheet_core::formatting::{format_hours, format_number, percentage};
use timesheet_core::models::AggregatedEntry;
use timesheet_core::Result;
use tracing::info;

use crate::analysis::{DashboardMetrics, LabeledHours, ProjectHours};
use crate::charts::ChartFigure;

/// Byte-order mark written before CSV content so spreadsheet tools pick UTF-8.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column headers of the CSV export, in output order.
pub const CSV_HEADERS: [&str; 7] = [
    "Employee",
    "Project No.",
    "Client",
    "Activity",
    "Project Description",
    "Hours",
    "Project",
];

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

// ── CSV ───────────────────────────────────────────────────────────────────────

/// Write `entries` as CSV: BOM, display headers, one row per entry.
pub fn write_csv<W: Write>(entries: &[AggregatedEntry], mut writer: W) -> Result<()> {
    writer.write_all(UTF8_BOM)?;

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADERS)?;
    for e in entries {
        let hours = e.hours.to_string();
        csv.write_record([
            e.employee.as_str(),
            e.project_no.as_str(),
            e.client.as_str(),
            e.activity.as_str(),
            e.project_description.as_str(),
            hours.as_str(),
            e.project_label.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the CSV export to `path`, replacing any existing file.
pub fn write_csv_file(entries: &[AggregatedEntry], path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(entries, std::io::BufWriter::new(file))?;
    info!("Wrote {} rows to {}", entries.len(), path.display());
    Ok(())
}

// ── HTML ──────────────────────────────────────────────────────────────────────

/// Everything the HTML report shows.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub title: String,
    pub generated_at: DateTime<Local>,
    /// Human-readable description of the active filters.
    pub filter_summary: String,
    pub metrics: DashboardMetrics,
    pub figures: Vec<ChartFigure>,
    pub top_projects: Vec<ProjectHours>,
    pub top_employees: Vec<LabeledHours>,
    /// Detail rows; the table is omitted when `None`.
    pub details: Option<Vec<AggregatedEntry>>,
    pub duplicates: Vec<AggregatedEntry>,
    /// Shown instead of the charts when the filters matched nothing.
    pub warning: Option<String>,
}

impl ReportContext {
    pub fn new(title: impl Into<String>, metrics: DashboardMetrics) -> Self {
        Self {
            title: title.into(),
            generated_at: Local::now(),
            filter_summary: "all projects, all employees".to_string(),
            metrics,
            figures: Vec::new(),
            top_projects: Vec::new(),
            top_employees: Vec::new(),
            details: None,
            duplicates: Vec::new(),
            warning: None,
        }
    }
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialise a figure for a `<script>` block; `</` cannot end the script early.
fn script_json(figure: &ChartFigure) -> Result<String> {
    let json = serde_json::to_string(&figure.to_value())?;
    Ok(json.replace("</", "<\\/"))
}

/// Render the self-contained report page.
pub fn render_html(report: &ReportContext) -> Result<String> {
    let mut html = String::with_capacity(16 * 1024);
    let title = escape_html(&report.title);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str(&format!("<script src=\"{PLOTLY_CDN}\"></script>\n"));
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");

    html.push_str(&format!("<h1>{title}</h1>\n"));
    html.push_str(&format!(
        "<p class=\"meta\">Generated {} &middot; Filters: {}</p>\n",
        report.generated_at.format("%Y-%m-%d %H:%M"),
        escape_html(&report.filter_summary)
    ));

    push_kpis(&mut html, &report.metrics);

    if let Some(warning) = &report.warning {
        html.push_str(&format!(
            "<div class=\"warning\">{}</div>\n",
            escape_html(warning)
        ));
    } else {
        for figure in &report.figures {
            html.push_str(&format!(
                "<div class=\"chart\" id=\"chart-{id}\"></div>\n<script>(function(){{var f={json};Plotly.newPlot(\"chart-{id}\",f.data,f.layout,{{responsive:true}});}})();</script>\n",
                id = escape_html(&figure.id),
                json = script_json(figure)?,
            ));
        }
    }

    if !report.top_projects.is_empty() {
        let total = report.metrics.total_hours;
        push_table(
            &mut html,
            "Top projects",
            &["Project", "Hours", "Share"],
            report.top_projects.iter().map(|p| {
                vec![
                    p.project_label.clone(),
                    format_hours(p.hours),
                    format!("{}%", percentage(p.hours, total, 1)),
                ]
            }),
        );
    }

    if !report.top_employees.is_empty() {
        push_table(
            &mut html,
            "Top employees",
            &["Employee", "Hours"],
            report
                .top_employees
                .iter()
                .map(|e| vec![e.label.clone(), format_hours(e.hours)]),
        );
    }

    if let Some(details) = &report.details {
        push_table(&mut html, "Details", &CSV_HEADERS, details.iter().map(entry_cells));
    }

    if !report.duplicates.is_empty() {
        push_table(
            &mut html,
            "Possible duplicates (same employee and project)",
            &CSV_HEADERS,
            report.duplicates.iter().map(entry_cells),
        );
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

/// Write a rendered report to `path`.
pub fn write_report(path: &Path, html: &str) -> Result<()> {
    std::fs::write(path, html)?;
    info!("Report written to {}", path.display());
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

const STYLE: &str = "<style>
body{font-family:-apple-system,Segoe UI,Roboto,sans-serif;margin:2rem;background:#f7f8fc;color:#222}
h1{color:#4b3f9e}
.meta{color:#666}
.kpis{display:flex;gap:1rem;flex-wrap:wrap;margin:1.5rem 0}
.kpi{background:linear-gradient(135deg,#667eea,#764ba2);color:#fff;border-radius:10px;padding:1rem 1.5rem;min-width:10rem}
.kpi .value{font-size:1.6rem;font-weight:bold}
.chart{background:#fff;border-radius:10px;margin:1rem 0;padding:.5rem}
.warning{background:#fff3cd;border:1px solid #ffe08a;padding:1rem;border-radius:6px}
table{border-collapse:collapse;background:#fff;margin:1rem 0;width:100%}
th,td{border:1px solid #ddd;padding:.4rem .6rem;text-align:left}
th{background:#eef}
</style>
";

fn push_kpis(html: &mut String, metrics: &DashboardMetrics) {
    let top = metrics
        .top_project
        .as_ref()
        .map(|p| format!("{} ({})", p.project_no, format_hours(p.hours)))
        .unwrap_or_else(|| "n/a".to_string());

    let cards = [
        ("Total hours", format_hours(metrics.total_hours)),
        ("Active projects", metrics.active_projects.to_string()),
        ("Employees", metrics.active_employees.to_string()),
        ("Top project", top),
        (
            "Avg. per employee",
            format_number(metrics.avg_hours_per_employee, 1),
        ),
    ];

    html.push_str("<div class=\"kpis\">\n");
    for (label, value) in cards {
        html.push_str(&format!(
            "<div class=\"kpi\"><div>{}</div><div class=\"value\">{}</div></div>\n",
            escape_html(label),
            escape_html(&value)
        ));
    }
    html.push_str("</div>\n");
}

fn entry_cells(e: &AggregatedEntry) -> Vec<String> {
    vec![
        e.employee.clone(),
        e.project_no.clone(),
        e.client.clone(),
        e.activity.clone(),
        e.project_description.clone(),
        format_number(e.hours, 2),
        e.project_label.clone(),
    ]
}

fn push_table<I>(html: &mut String, caption: &str, headers: &[&str], rows: I)
where
    I: IntoIterator<Item = Vec<String>>,
{
    html.push_str(&format!("<h2>{}</h2>\n<table>\n<tr>", escape_html(caption)));
    for h in headers {
        html.push_str(&format!("<th>{}</th>", escape_html(h)));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{}</td>", escape_html(&cell)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{top_employees, top_projects};
    use crate::charts::build_figure;
    use tempfile::TempDir;
    use timesheet_core::models::{AggregationKey, ChartKind, LabelStyle};

    fn entry(employee: &str, project: &str, description: &str, hours: f64) -> AggregatedEntry {
        AggregatedEntry::from_key(
            AggregationKey {
                employee: employee.to_string(),
                project_no: project.to_string(),
                client: "ACME".to_string(),
                activity: "Dev".to_string(),
                project_description: description.to_string(),
            },
            hours,
            &LabelStyle::default(),
        )
    }

    fn report(entries: &[AggregatedEntry]) -> ReportContext {
        let mut ctx = ReportContext::new("Timesheet report", DashboardMetrics::compute(entries));
        ctx.figures = vec![build_figure(ChartKind::Bar, entries)];
        ctx.top_projects = top_projects(entries, 10);
        ctx.top_employees = top_employees(entries, 10);
        ctx
    }

    // ── CSV ───────────────────────────────────────────────────────────────────

    #[test]
    fn test_write_csv_bom_and_headers() {
        let mut buf = Vec::new();
        write_csv(&[entry("Ann", "P1", "Build, test", 7.5)], &mut buf).unwrap();

        assert!(buf.starts_with(UTF8_BOM));
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Employee,Project No.,Client,Activity,Project Description,Hours,Project"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Ann,P1,ACME,Dev,\"Build, test\",7.5,ACME - P1"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_write_csv_empty_has_header_only() {
        let mut buf = Vec::new();
        write_csv(&[], &mut buf).unwrap();
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_write_csv_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        write_csv_file(&[entry("Ann", "P1", "D", 1.0)], &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
    }

    // ── HTML ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_html_contains_kpis_and_chart() {
        let entries = vec![entry("Ann", "P1", "D", 10.0), entry("Bob", "P1", "D", 6.0)];
        let html = render_html(&report(&entries)).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Timesheet report</title>"));
        assert!(html.contains("16 h"));
        assert!(html.contains("id=\"chart-bar\""));
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("<h2>Top projects</h2>"));
        assert!(!html.contains("<h2>Details</h2>"));
    }

    #[test]
    fn test_render_html_script_safe_json() {
        let entries = vec![entry("</script><b>x", "P1", "D", 1.0)];
        let html = render_html(&report(&entries)).unwrap();
        assert!(!html.contains("</script><b>"));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn test_render_html_details_and_duplicates() {
        let entries = vec![entry("Ann", "P1", "A & B", 1.0), entry("Ann", "P1", "C", 2.0)];
        let mut ctx = report(&entries);
        ctx.details = Some(entries.clone());
        ctx.duplicates = entries.clone();
        let html = render_html(&ctx).unwrap();
        assert!(html.contains("<h2>Details</h2>"));
        assert!(html.contains("Possible duplicates"));
        assert!(html.contains("<td>A &amp; B</td>"));
    }

    #[test]
    fn test_render_html_warning_replaces_charts() {
        let mut ctx = report(&[]);
        ctx.warning = Some("No rows match project=P9 employee=all".to_string());
        let html = render_html(&ctx).unwrap();
        assert!(html.contains("class=\"warning\""));
        assert!(!html.contains("Plotly.newPlot"));
        assert!(html.contains("n/a"));
    }

    #[test]
    fn test_write_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.html");
        write_report(&path, "<html></html>").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
