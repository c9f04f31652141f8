use serde::{Deserialize, Serialize};

/// One validated row from the timesheet export.
///
/// Built by the reader at the I/O boundary; text fields are kept exactly as
/// they appear in the source (trimming happens during aggregation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimesheetRecord {
    #[serde(rename = "Employee")]
    pub employee: String,
    #[serde(rename = "Project_No")]
    pub project_no: String,
    #[serde(rename = "Client")]
    pub client: String,
    #[serde(rename = "Activity")]
    pub activity: String,
    #[serde(rename = "Project_Description")]
    pub project_description: String,
    /// `None` when the source value could not be read as a number.
    #[serde(rename = "Hours")]
    pub hours: Option<f64>,
    #[serde(rename = "Staff_Comment", default)]
    pub staff_comment: Option<String>,
}

impl TimesheetRecord {
    /// `Some(hours)` only when the record carries a positive, finite value.
    pub fn positive_hours(&self) -> Option<f64> {
        self.hours.filter(|h| h.is_finite() && *h > 0.0)
    }

    /// The trimmed five-field natural key of this record.
    pub fn key(&self) -> AggregationKey {
        AggregationKey {
            employee: self.employee.trim().to_string(),
            project_no: self.project_no.trim().to_string(),
            client: self.client.trim().to_string(),
            activity: self.activity.trim().to_string(),
            project_description: self.project_description.trim().to_string(),
        }
    }
}

/// Natural key: the five trimmed text fields that identify one aggregation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregationKey {
    pub employee: String,
    pub project_no: String,
    pub client: String,
    pub activity: String,
    pub project_description: String,
}

impl AggregationKey {
    /// Project the natural key down to the duplicate-detection key.
    pub fn coarse(&self) -> CoarseKey {
        CoarseKey {
            employee: self.employee.clone(),
            project_no: self.project_no.clone(),
        }
    }
}

/// Coarse key `(Employee, Project_No)` used only to flag duplicate candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoarseKey {
    pub employee: String,
    pub project_no: String,
}

/// One summed-hours row per unique natural key, with derived display labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntry {
    #[serde(rename = "Employee")]
    pub employee: String,
    #[serde(rename = "Project_No")]
    pub project_no: String,
    #[serde(rename = "Client")]
    pub client: String,
    #[serde(rename = "Activity")]
    pub activity: String,
    #[serde(rename = "Project_Description")]
    pub project_description: String,
    #[serde(rename = "Hours")]
    pub hours: f64,
    #[serde(rename = "Project_Label")]
    pub project_label: String,
    #[serde(rename = "Project_Full_Label")]
    pub project_full_label: String,
}

impl AggregatedEntry {
    /// Build an entry from its key and summed hours, deriving both labels.
    pub fn from_key(key: AggregationKey, hours: f64, style: &LabelStyle) -> Self {
        let project_label = style.project_label(&key.client, &key.project_no);
        let project_full_label =
            style.full_label(&key.client, &key.project_no, &key.project_description);
        Self {
            employee: key.employee,
            project_no: key.project_no,
            client: key.client,
            activity: key.activity,
            project_description: key.project_description,
            hours,
            project_label,
            project_full_label,
        }
    }

    /// Rebuild the natural key of this entry.
    pub fn key(&self) -> AggregationKey {
        AggregationKey {
            employee: self.employee.clone(),
            project_no: self.project_no.clone(),
            client: self.client.clone(),
            activity: self.activity.clone(),
            project_description: self.project_description.clone(),
        }
    }

    pub fn coarse_key(&self) -> CoarseKey {
        CoarseKey {
            employee: self.employee.clone(),
            project_no: self.project_no.clone(),
        }
    }
}

/// Chart types the report can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    /// Hours per project, stacked by employee.
    Bar,
    /// Share of hours per project.
    Pie,
    /// Project totals, largest first.
    Line,
    /// Employee × project matrix.
    Heatmap,
    /// Client → project → employee hierarchy.
    Treemap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Line,
        ChartKind::Heatmap,
        ChartKind::Treemap,
    ];

    /// Lowercase identifier, as accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Treemap => "treemap",
        }
    }
}

impl std::fmt::Display for ChartKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default number of description characters kept in the full project label.
pub const DEFAULT_DESCRIPTION_LIMIT: usize = 50;

/// How project labels are assembled from client, project number and description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelStyle {
    /// Placed between client and project number.
    pub separator: String,
    /// Line-break marker placed before the description in the full label.
    pub line_break: String,
    /// Maximum description length in characters; `None` keeps it whole.
    pub description_limit: Option<usize>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            separator: " - ".to_string(),
            line_break: "<br>".to_string(),
            description_limit: Some(DEFAULT_DESCRIPTION_LIMIT),
        }
    }
}

impl LabelStyle {
    /// Style with a custom description limit and default markers.
    pub fn with_limit(description_limit: Option<usize>) -> Self {
        Self {
            description_limit,
            ..Self::default()
        }
    }

    /// `"{client}{separator}{project_no}"`, e.g. `"ACME - P-100"`.
    pub fn project_label(&self, client: &str, project_no: &str) -> String {
        format!("{}{}{}", client, self.separator, project_no)
    }

    /// Project label followed by the line-break marker and the (possibly
    /// truncated) description.
    pub fn full_label(&self, client: &str, project_no: &str, description: &str) -> String {
        let description = match self.description_limit {
            Some(limit) => truncate_chars(description, limit),
            None => description,
        };
        format!(
            "{}{}{}",
            self.project_label(client, project_no),
            self.line_break,
            description
        )
    }
}

/// Return at most `max_chars` Unicode scalar values of `s`.
///
/// Never splits a multi-byte character.
///
/// ```
/// use timesheet_core::models::truncate_chars;
///
/// assert_eq!(truncate_chars("Разработка", 3), "Раз");
/// assert_eq!(truncate_chars("abc", 10), "abc");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}
