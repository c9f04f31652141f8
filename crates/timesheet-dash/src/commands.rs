use std::io::Write;

use anyhow::Result;
use timesheet_core::formatting::{format_hours, format_number};
use timesheet_core::models::ChartKind;
use timesheet_core::settings::Settings;
use timesheet_data::aggregator::AggregationOutcome;
use timesheet_data::analysis::{top_employees, top_projects, DashboardMetrics, EntryFilter};
use timesheet_data::charts::{activity_share_figure, build_figure, client_share_figure};
use timesheet_data::export::{render_html, write_csv_file, write_report, ReportContext};

/// Rows in the report's top-N tables.
const REPORT_TOP_N: usize = 10;

pub fn entry_filter(settings: &Settings) -> EntryFilter {
    EntryFilter::new(settings.project.clone(), settings.employee.clone())
}

fn describe(filter: &EntryFilter) -> String {
    format!(
        "project={}, employee={}",
        filter.project.as_deref().unwrap_or("all"),
        filter.employee.as_deref().unwrap_or("all")
    )
}

/// Assemble the report for the rows selected by `filter`.
pub fn build_report(
    outcome: &AggregationOutcome,
    filter: &EntryFilter,
    charts: &[ChartKind],
    details: bool,
) -> ReportContext {
    let filtered = filter.apply(&outcome.aggregated);
    let entries = &filtered.entries;

    let mut ctx = ReportContext::new("Timesheet report", DashboardMetrics::compute(entries));
    ctx.filter_summary = describe(filter);

    let mut seen = Vec::with_capacity(charts.len());
    for kind in charts {
        if !seen.contains(kind) {
            seen.push(*kind);
            ctx.figures.push(build_figure(*kind, entries));
        }
    }
    if !entries.is_empty() {
        ctx.figures.push(client_share_figure(entries));
        ctx.figures.push(activity_share_figure(entries));
    }

    ctx.top_projects = top_projects(entries, REPORT_TOP_N);
    ctx.top_employees = top_employees(entries, REPORT_TOP_N);
    if details {
        ctx.details = Some(entries.clone());
    }
    ctx.duplicates = outcome
        .duplicates
        .iter()
        .filter(|e| filter.matches(e))
        .cloned()
        .collect();
    ctx.warning = filtered.warning.map(|w| w.to_string());
    ctx
}

/// `--view report`: write the HTML report and, when asked, the CSV export.
pub fn run_report(settings: &Settings, outcome: &AggregationOutcome) -> Result<()> {
    let filter = entry_filter(settings);
    let ctx = build_report(outcome, &filter, &settings.charts, settings.details);

    let html = render_html(&ctx)?;
    write_report(&settings.output, &html)?;
    println!("Report written to {}", settings.output.display());

    if let Some(csv_path) = &settings.csv {
        let rows = filter.apply(&outcome.aggregated).entries;
        write_csv_file(&rows, csv_path)?;
        println!("CSV written to {} ({} rows)", csv_path.display(), rows.len());
    }
    Ok(())
}

/// `--view summary`: KPIs and duplicate candidates as plain text.
pub fn write_summary<W: Write>(
    out: &mut W,
    outcome: &AggregationOutcome,
    filter: &EntryFilter,
) -> Result<()> {
    let filtered = filter.apply(&outcome.aggregated);
    let metrics = DashboardMetrics::compute(&filtered.entries);

    writeln!(out, "Filters:                {}", describe(filter))?;
    writeln!(
        out,
        "Records read:           {} ({} dropped without positive hours)",
        outcome.records_read, outcome.records_dropped
    )?;
    writeln!(out, "Aggregated rows:        {}", filtered.entries.len())?;
    if let Some(warning) = &filtered.warning {
        writeln!(out, "Warning:                {warning}")?;
    }
    writeln!(out, "Total hours:            {}", format_hours(metrics.total_hours))?;
    writeln!(out, "Active projects:        {}", metrics.active_projects)?;
    writeln!(out, "Active employees:       {}", metrics.active_employees)?;
    match &metrics.top_project {
        Some(top) => writeln!(
            out,
            "Top project:            {} ({})",
            top.project_no,
            format_hours(top.hours)
        )?,
        None => writeln!(out, "Top project:            n/a")?,
    }
    writeln!(
        out,
        "Avg hours per employee: {}",
        format_number(metrics.avg_hours_per_employee, 1)
    )?;

    let duplicates: Vec<_> = outcome
        .duplicates
        .iter()
        .filter(|e| filter.matches(e))
        .collect();
    writeln!(out)?;
    writeln!(out, "Duplicate candidates:   {}", duplicates.len())?;
    for e in duplicates {
        writeln!(
            out,
            "  {} | {} | {} | {} | {} | {}",
            e.employee,
            e.project_no,
            e.client,
            e.activity,
            e.project_description,
            format_number(e.hours, 2)
        )?;
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
