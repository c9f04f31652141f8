//! Filters and read-only metrics over aggregated timesheet rows.
//!
//! Everything here consumes the aggregator's output and produces the numbers
//! the report and the terminal dashboard display: KPI cards, top-N tables and
//! per-client / per-activity breakdowns.

use std::collections::{BTreeSet, HashMap};

use timesheet_core::error::EmptyResultWarning;
use timesheet_core::models::AggregatedEntry;
use tracing::debug;

// ── Filtering ─────────────────────────────────────────────────────────────────

/// Project / employee selection. `None` means "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    pub project: Option<String>,
    pub employee: Option<String>,
}

/// Rows that survived an [`EntryFilter`].
#[derive(Debug, Clone, Default)]
pub struct FilteredEntries {
    pub entries: Vec<AggregatedEntry>,
    /// Set when the filters matched nothing.
    pub warning: Option<EmptyResultWarning>,
}

impl EntryFilter {
    pub fn new(project: Option<String>, employee: Option<String>) -> Self {
        Self { project, employee }
    }

    /// `true` when neither project nor employee is restricted.
    pub fn is_unrestricted(&self) -> bool {
        self.project.is_none() && self.employee.is_none()
    }

    pub fn matches(&self, entry: &AggregatedEntry) -> bool {
        let project_ok = self
            .project
            .as_deref()
            .map_or(true, |p| entry.project_no == p.trim());
        let employee_ok = self
            .employee
            .as_deref()
            .map_or(true, |e| entry.employee == e.trim());
        project_ok && employee_ok
    }

    /// Keep the matching rows. An empty result is not an error; it carries an
    /// [`EmptyResultWarning`] instead.
    pub fn apply(&self, entries: &[AggregatedEntry]) -> FilteredEntries {
        let kept: Vec<AggregatedEntry> = entries
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect();

        let warning = if kept.is_empty() {
            let warning = EmptyResultWarning {
                project: self.project.clone().unwrap_or_else(|| "all".to_string()),
                employee: self.employee.clone().unwrap_or_else(|| "all".to_string()),
            };
            debug!("{}", warning);
            Some(warning)
        } else {
            None
        };

        FilteredEntries {
            entries: kept,
            warning,
        }
    }
}

/// Values offered by the project and employee selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Sorted unique Project_No values.
    pub projects: Vec<String>,
    /// Sorted unique Employee values.
    pub employees: Vec<String>,
}

/// Collect the sorted, de-duplicated selector values from `entries`.
pub fn filter_options(entries: &[AggregatedEntry]) -> FilterOptions {
    let projects: BTreeSet<&str> = entries.iter().map(|e| e.project_no.as_str()).collect();
    let employees: BTreeSet<&str> = entries.iter().map(|e| e.employee.as_str()).collect();
    FilterOptions {
        projects: projects.into_iter().map(str::to_string).collect(),
        employees: employees.into_iter().map(str::to_string).collect(),
    }
}

// ── Breakdowns ────────────────────────────────────────────────────────────────

/// Hours summed under one label (a project, employee, client or activity).
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledHours {
    pub label: String,
    pub hours: f64,
}

/// Project totals, grouped by (Project_No, Project_Label).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectHours {
    pub project_no: String,
    pub project_label: String,
    pub hours: f64,
}

/// Sum hours per key, largest first, ties by key.
fn sum_by<K, F>(entries: &[AggregatedEntry], key_fn: F) -> Vec<(K, f64)>
where
    K: std::hash::Hash + Eq + Ord + Clone,
    F: Fn(&AggregatedEntry) -> K,
{
    let mut totals: HashMap<K, f64> = HashMap::new();
    for entry in entries {
        *totals.entry(key_fn(entry)).or_default() += entry.hours;
    }
    let mut rows: Vec<(K, f64)> = totals.into_iter().collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

/// Every project with its summed hours, largest first.
pub fn project_totals(entries: &[AggregatedEntry]) -> Vec<ProjectHours> {
    sum_by(entries, |e| (e.project_no.clone(), e.project_label.clone()))
        .into_iter()
        .map(|((project_no, project_label), hours)| ProjectHours {
            project_no,
            project_label,
            hours,
        })
        .collect()
}

/// The `n` projects with the most hours.
pub fn top_projects(entries: &[AggregatedEntry], n: usize) -> Vec<ProjectHours> {
    let mut rows = project_totals(entries);
    rows.truncate(n);
    rows
}

/// The `n` employees with the most hours.
pub fn top_employees(entries: &[AggregatedEntry], n: usize) -> Vec<LabeledHours> {
    let mut rows = labeled(sum_by(entries, |e| e.employee.clone()));
    rows.truncate(n);
    rows
}

pub fn hours_by_client(entries: &[AggregatedEntry]) -> Vec<LabeledHours> {
    labeled(sum_by(entries, |e| e.client.clone()))
}

pub fn hours_by_activity(entries: &[AggregatedEntry]) -> Vec<LabeledHours> {
    labeled(sum_by(entries, |e| e.activity.clone()))
}

fn labeled(rows: Vec<(String, f64)>) -> Vec<LabeledHours> {
    rows.into_iter()
        .map(|(label, hours)| LabeledHours { label, hours })
        .collect()
}

// ── DashboardMetrics ──────────────────────────────────────────────────────────

/// Project with the largest share of hours.
#[derive(Debug, Clone, PartialEq)]
pub struct TopProject {
    pub project_no: String,
    pub hours: f64,
}

/// KPI values shown at the top of the report and the dashboard.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardMetrics {
    pub total_hours: f64,
    pub active_projects: usize,
    pub active_employees: usize,
    /// `None` when there are no rows.
    pub top_project: Option<TopProject>,
    /// Mean of per-employee totals; `0.0` when there are no rows.
    pub avg_hours_per_employee: f64,
}

impl DashboardMetrics {
    pub fn compute(entries: &[AggregatedEntry]) -> Self {
        if entries.is_empty() {
            return Self::default();
        }

        let total_hours: f64 = entries.iter().map(|e| e.hours).sum();
        let projects = sum_by(entries, |e| e.project_no.clone());
        let employees = sum_by(entries, |e| e.employee.clone());

        let top_project = projects.first().map(|(project_no, hours)| TopProject {
            project_no: project_no.clone(),
            hours: *hours,
        });

        let employee_total: f64 = employees.iter().map(|(_, h)| h).sum();
        let avg_hours_per_employee = employee_total / employees.len() as f64;

        Self {
            total_hours,
            active_projects: projects.len(),
            active_employees: employees.len(),
            top_project,
            avg_hours_per_employee,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use timesheet_core::models::{AggregationKey, LabelStyle};

    fn entry(
        employee: &str,
        project: &str,
        client: &str,
        activity: &str,
        hours: f64,
    ) -> AggregatedEntry {
        AggregatedEntry::from_key(
            AggregationKey {
                employee: employee.to_string(),
                project_no: project.to_string(),
                client: client.to_string(),
                activity: activity.to_string(),
                project_description: format!("{project} description"),
            },
            hours,
            &LabelStyle::default(),
        )
    }

    fn sample() -> Vec<AggregatedEntry> {
        vec![
            entry("Ann", "P1", "ACME", "Dev", 10.0),
            entry("Ann", "P2", "Globex", "QA", 4.0),
            entry("Bob", "P1", "ACME", "Dev", 6.0),
            entry("Cid", "P3", "Globex", "Design", 2.0),
        ]
    }

    // ── EntryFilter ───────────────────────────────────────────────────────────

    #[test]
    fn test_unrestricted_filter_keeps_everything() {
        let filter = EntryFilter::default();
        assert!(filter.is_unrestricted());
        let result = filter.apply(&sample());
        assert_eq!(result.entries.len(), 4);
        assert!(result.warning.is_none());
    }

    #[test]
    fn test_filter_by_project_and_employee() {
        let filter = EntryFilter::new(Some("P1".into()), Some("Bob".into()));
        let result = filter.apply(&sample());
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].hours, 6.0);
    }

    #[test]
    fn test_filter_value_is_trimmed() {
        let filter = EntryFilter::new(Some(" P2 ".into()), None);
        assert_eq!(filter.apply(&sample()).entries.len(), 1);
    }

    #[test]
    fn test_empty_filter_result_warns() {
        let filter = EntryFilter::new(Some("P3".into()), Some("Ann".into()));
        let result = filter.apply(&sample());
        assert!(result.entries.is_empty());
        let warning = result.warning.expect("warning present");
        assert_eq!(warning.project, "P3");
        assert_eq!(warning.employee, "Ann");
    }

    #[test]
    fn test_filter_options_sorted_unique() {
        let options = filter_options(&sample());
        assert_eq!(options.projects, vec!["P1", "P2", "P3"]);
        assert_eq!(options.employees, vec!["Ann", "Bob", "Cid"]);
    }

    // ── Breakdowns ────────────────────────────────────────────────────────────

    #[test]
    fn test_top_projects_grouped_and_sorted() {
        let top = top_projects(&sample(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].project_no, "P1");
        assert_eq!(top[0].project_label, "ACME - P1");
        assert_eq!(top[0].hours, 16.0);
        assert_eq!(top[1].project_no, "P2");
    }

    #[test]
    fn test_top_employees() {
        let top = top_employees(&sample(), 10);
        let labels: Vec<&str> = top.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Ann", "Bob", "Cid"]);
        assert_eq!(top[0].hours, 14.0);
    }

    #[test]
    fn test_ties_broken_by_name() {
        let entries = vec![
            entry("Zed", "P1", "C", "Dev", 3.0),
            entry("Amy", "P1", "C", "Dev", 3.0),
        ];
        let top = top_employees(&entries, 10);
        assert_eq!(top[0].label, "Amy");
    }

    #[test]
    fn test_hours_by_client_and_activity() {
        let clients = hours_by_client(&sample());
        assert_eq!(
            clients,
            vec![
                LabeledHours {
                    label: "ACME".into(),
                    hours: 16.0
                },
                LabeledHours {
                    label: "Globex".into(),
                    hours: 6.0
                },
            ]
        );

        let activities = hours_by_activity(&sample());
        assert_eq!(activities[0].label, "Dev");
        assert_eq!(activities.len(), 3);
    }

    // ── DashboardMetrics ──────────────────────────────────────────────────────

    #[test]
    fn test_metrics_compute() {
        let metrics = DashboardMetrics::compute(&sample());
        assert_eq!(metrics.total_hours, 22.0);
        assert_eq!(metrics.active_projects, 3);
        assert_eq!(metrics.active_employees, 3);
        assert_eq!(
            metrics.top_project,
            Some(TopProject {
                project_no: "P1".into(),
                hours: 16.0
            })
        );
        assert!((metrics.avg_hours_per_employee - 22.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_metrics_empty_reports_absent_top_project() {
        let metrics = DashboardMetrics::compute(&[]);
        assert_eq!(metrics.total_hours, 0.0);
        assert_eq!(metrics.active_projects, 0);
        assert_eq!(metrics.active_employees, 0);
        assert!(metrics.top_project.is_none());
        assert_eq!(metrics.avg_hours_per_employee, 0.0);
    }
}
