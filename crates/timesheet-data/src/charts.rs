//! Chart figures for the HTML report.
//!
//! Each builder turns aggregated rows into a Plotly figure description
//! (`data` traces plus `layout`). Drawing is left to plotly.js in the page.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{json, Value};
use timesheet_core::formatting::format_number;
use timesheet_core::models::{AggregatedEntry, ChartKind};

use crate::analysis::{hours_by_activity, hours_by_client, project_totals, LabeledHours};

/// A ready-to-embed chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartFigure {
    /// DOM id used for the chart container.
    pub id: String,
    pub title: String,
    pub data: Vec<Value>,
    pub layout: Value,
}

impl ChartFigure {
    fn new(id: &str, title: &str, data: Vec<Value>, extra_layout: Value) -> Self {
        let mut layout = json!({
            "title": { "text": format!("<b>{title}</b>") },
            "template": "plotly_white",
            "paper_bgcolor": "rgba(0,0,0,0)",
            "plot_bgcolor": "rgba(0,0,0,0)",
        });
        if let (Some(base), Value::Object(extra)) = (layout.as_object_mut(), extra_layout) {
            base.extend(extra);
        }
        Self {
            id: id.to_string(),
            title: title.to_string(),
            data,
            layout,
        }
    }

    /// `{"data": [...], "layout": {...}}`, the shape `Plotly.newPlot` takes.
    pub fn to_value(&self) -> Value {
        json!({ "data": self.data, "layout": self.layout })
    }
}

/// Build the main figure of `kind` for `entries`.
pub fn build_figure(kind: ChartKind, entries: &[AggregatedEntry]) -> ChartFigure {
    match kind {
        ChartKind::Bar => stacked_bar(entries),
        ChartKind::Pie => project_pie(entries),
        ChartKind::Line => project_line(entries),
        ChartKind::Heatmap => heatmap(entries),
        ChartKind::Treemap => treemap(entries),
    }
}

/// Donut chart of hours per client.
pub fn client_share_figure(entries: &[AggregatedEntry]) -> ChartFigure {
    share_donut("clients", "Hours by client", &hours_by_client(entries))
}

/// Donut chart of hours per activity.
pub fn activity_share_figure(entries: &[AggregatedEntry]) -> ChartFigure {
    share_donut("activities", "Hours by activity", &hours_by_activity(entries))
}

// ── Builders ──────────────────────────────────────────────────────────────────

fn hour_texts(values: &[f64]) -> Vec<String> {
    values.iter().map(|h| format_number(*h, 0)).collect()
}

fn stacked_bar(entries: &[AggregatedEntry]) -> ChartFigure {
    // employee -> project label -> hours, both sorted for stable output.
    let mut by_employee: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for e in entries {
        *by_employee
            .entry(e.employee.as_str())
            .or_default()
            .entry(e.project_label.as_str())
            .or_default() += e.hours;
    }

    let traces = by_employee
        .into_iter()
        .map(|(employee, projects)| {
            let (x, y): (Vec<&str>, Vec<f64>) = projects.into_iter().unzip();
            json!({
                "type": "bar",
                "name": employee,
                "x": x,
                "y": y,
                "text": hour_texts(&y),
                "textposition": "auto",
                "hovertemplate": "<b>%{fullData.name}</b><br>Project: %{x}<br>Hours: %{y:,.0f}<extra></extra>",
            })
        })
        .collect();

    ChartFigure::new(
        "bar",
        "Hours by employee and project",
        traces,
        json!({
            "barmode": "stack",
            "height": 600,
            "xaxis": { "title": { "text": "Project" }, "categoryorder": "total descending" },
            "yaxis": { "title": { "text": "Hours" } },
        }),
    )
}

fn project_pie(entries: &[AggregatedEntry]) -> ChartFigure {
    let totals = project_totals(entries);
    let labels: Vec<&str> = totals.iter().map(|p| p.project_label.as_str()).collect();
    let values: Vec<f64> = totals.iter().map(|p| p.hours).collect();

    ChartFigure::new(
        "pie",
        "Project share of total hours",
        vec![json!({
            "type": "pie",
            "labels": labels,
            "values": values,
            "hole": 0.4,
            "textinfo": "percent+label",
            "hovertemplate": "<b>%{label}</b><br>Hours: %{value:,.0f}<br>Share: %{percent}<extra></extra>",
        })],
        json!({ "height": 500 }),
    )
}

fn project_line(entries: &[AggregatedEntry]) -> ChartFigure {
    let totals = project_totals(entries);
    let x: Vec<&str> = totals.iter().map(|p| p.project_label.as_str()).collect();
    let y: Vec<f64> = totals.iter().map(|p| p.hours).collect();

    ChartFigure::new(
        "line",
        "Project comparison",
        vec![json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Hours",
            "x": x,
            "y": y,
            "text": hour_texts(&y),
            "line": { "width": 3, "color": "#667eea", "shape": "spline" },
            "marker": { "size": 10, "color": "#764ba2" },
            "hovertemplate": "<b>Project:</b> %{x}<br><b>Hours:</b> %{y:,.0f}<extra></extra>",
        })],
        json!({
            "height": 500,
            "xaxis": { "title": { "text": "Project" } },
            "yaxis": { "title": { "text": "Hours" } },
        }),
    )
}

/// Employee × project matrix, zero-filled where an employee has no hours.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapGrid {
    pub employees: Vec<String>,
    pub projects: Vec<String>,
    /// `z[row][col]` = hours of `employees[row]` on `projects[col]`.
    pub z: Vec<Vec<f64>>,
}

/// Pivot `entries` into an employee × project-label grid.
pub fn heatmap_grid(entries: &[AggregatedEntry]) -> HeatmapGrid {
    let employees: Vec<String> = entries
        .iter()
        .map(|e| e.employee.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let projects: Vec<String> = entries
        .iter()
        .map(|e| e.project_label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let row_of: HashMap<&str, usize> = employees
        .iter()
        .enumerate()
        .map(|(i, e)| (e.as_str(), i))
        .collect();
    let col_of: HashMap<&str, usize> = projects
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();

    let mut z = vec![vec![0.0; projects.len()]; employees.len()];
    for e in entries {
        let row = row_of[e.employee.as_str()];
        let col = col_of[e.project_label.as_str()];
        z[row][col] += e.hours;
    }

    HeatmapGrid {
        employees,
        projects,
        z,
    }
}

fn heatmap(entries: &[AggregatedEntry]) -> ChartFigure {
    let grid = heatmap_grid(entries);
    let text: Vec<Vec<String>> = grid
        .z
        .iter()
        .map(|row| {
            row.iter()
                .map(|v| if *v > 0.0 { format_number(*v, 0) } else { String::new() })
                .collect()
        })
        .collect();

    ChartFigure::new(
        "heatmap",
        "Employees × projects",
        vec![json!({
            "type": "heatmap",
            "z": grid.z,
            "x": grid.projects,
            "y": grid.employees,
            "text": text,
            "texttemplate": "%{text}",
            "colorscale": "YlOrRd",
            "colorbar": { "title": { "text": "Hours" } },
            "hovertemplate": "<b>Employee:</b> %{y}<br><b>Project:</b> %{x}<br><b>Hours:</b> %{z:,.0f}<extra></extra>",
        })],
        json!({
            "height": 900,
            "xaxis": { "title": { "text": "Project" }, "tickangle": -45 },
            "yaxis": { "title": { "text": "Employee" }, "autorange": "reversed" },
            "margin": { "l": 150, "r": 50, "t": 50, "b": 200 },
        }),
    )
}

/// One node of the client → project → employee hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TreemapNode {
    pub id: String,
    pub label: String,
    /// Empty for the root.
    pub parent: String,
    pub hours: f64,
}

/// Root label of the treemap hierarchy.
pub const TREEMAP_ROOT: &str = "All";

/// Flatten `entries` into treemap nodes. Every parent's hours equal the sum
/// of its children, so the figure can use `branchvalues = "total"`.
pub fn treemap_nodes(entries: &[AggregatedEntry]) -> Vec<TreemapNode> {
    let mut tree: BTreeMap<&str, BTreeMap<&str, BTreeMap<&str, f64>>> = BTreeMap::new();
    for e in entries {
        *tree
            .entry(e.client.as_str())
            .or_default()
            .entry(e.project_label.as_str())
            .or_default()
            .entry(e.employee.as_str())
            .or_default() += e.hours;
    }

    let root_id = TREEMAP_ROOT.to_string();
    let mut nodes = vec![TreemapNode {
        id: root_id.clone(),
        label: TREEMAP_ROOT.to_string(),
        parent: String::new(),
        hours: 0.0,
    }];

    for (client, projects) in tree {
        let client_id = format!("{root_id}/{}", id_segment(client));
        let client_slot = nodes.len();
        nodes.push(TreemapNode {
            id: client_id.clone(),
            label: client.to_string(),
            parent: root_id.clone(),
            hours: 0.0,
        });

        for (project, employees) in projects {
            let project_id = format!("{client_id}/{}", id_segment(project));
            let project_slot = nodes.len();
            nodes.push(TreemapNode {
                id: project_id.clone(),
                label: project.to_string(),
                parent: client_id.clone(),
                hours: 0.0,
            });

            for (employee, hours) in employees {
                nodes.push(TreemapNode {
                    id: format!("{project_id}/{}", id_segment(employee)),
                    label: employee.to_string(),
                    parent: project_id.clone(),
                    hours,
                });
                nodes[project_slot].hours += hours;
            }
            let project_hours = nodes[project_slot].hours;
            nodes[client_slot].hours += project_hours;
        }
        let client_hours = nodes[client_slot].hours;
        nodes[0].hours += client_hours;
    }

    nodes
}

/// Escape `/` (and the escape character itself) so node ids built by joining
/// segments with `/` stay unique.
fn id_segment(value: &str) -> String {
    value.replace('\\', "\\\\").replace('/', "\\/")
}

fn treemap(entries: &[AggregatedEntry]) -> ChartFigure {
    let nodes = treemap_nodes(entries);
    let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let labels: Vec<&str> = nodes.iter().map(|n| n.label.as_str()).collect();
    let parents: Vec<&str> = nodes.iter().map(|n| n.parent.as_str()).collect();
    let values: Vec<f64> = nodes.iter().map(|n| n.hours).collect();

    ChartFigure::new(
        "treemap",
        "Hierarchy: client → project → employee",
        vec![json!({
            "type": "treemap",
            "ids": ids,
            "labels": labels,
            "parents": parents,
            "values": values,
            "branchvalues": "total",
            "marker": { "colors": values, "colorscale": "Viridis" },
            "texttemplate": "%{label}<br>%{value:,.0f} h",
            "hovertemplate": "<b>%{label}</b><br>Hours: %{value:,.0f}<extra></extra>",
        })],
        json!({ "height": 600 }),
    )
}

fn share_donut(id: &str, title: &str, rows: &[LabeledHours]) -> ChartFigure {
    let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
    let values: Vec<f64> = rows.iter().map(|r| r.hours).collect();
    ChartFigure::new(
        id,
        title,
        vec![json!({
            "type": "pie",
            "labels": labels,
            "values": values,
            "hole": 0.4,
            "textinfo": "percent+label",
        })],
        json!({ "height": 400 }),
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
