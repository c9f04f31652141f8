//! Hours aggregation by natural key and duplicate-candidate detection.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use timesheet_core::models::{
    AggregatedEntry, AggregationKey, CoarseKey, LabelStyle, TimesheetRecord,
};
use timesheet_core::Result;
use tracing::debug;

use crate::reader::load_source;

// ── AggregateOrder ────────────────────────────────────────────────────────────

/// Row order of the aggregated result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregateOrder {
    /// Order in which each key first appears in the input.
    #[default]
    FirstSeen,
    /// Lexicographic by (Employee, Project_No, Client, Activity, Description).
    ByKey,
    /// Largest hours first; ties keep first-seen order.
    ByHoursDesc,
}

// ── AggregationOutcome ────────────────────────────────────────────────────────

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationOutcome {
    /// One row per unique natural key.
    pub aggregated: Vec<AggregatedEntry>,
    /// Rows whose (Employee, Project_No) occurs more than once in `aggregated`,
    /// sorted by that coarse key.
    pub duplicates: Vec<AggregatedEntry>,
    /// Number of input records examined.
    pub records_read: usize,
    /// Records dropped because their Hours were not a positive number.
    pub records_dropped: usize,
}

impl AggregationOutcome {
    /// Sum of hours over all aggregated rows.
    pub fn total_hours(&self) -> f64 {
        self.aggregated.iter().map(|e| e.hours).sum()
    }
}

// ── TimesheetAggregator ───────────────────────────────────────────────────────

/// Groups timesheet records by natural key and sums their hours.
///
/// Pure: the input slice is only borrowed and the same input always yields
/// the same outcome.
#[derive(Debug, Clone, Default)]
pub struct TimesheetAggregator {
    style: LabelStyle,
    order: AggregateOrder,
}

impl TimesheetAggregator {
    pub fn new(style: LabelStyle) -> Self {
        Self {
            style,
            order: AggregateOrder::default(),
        }
    }

    /// Request a specific row order for the aggregated result.
    pub fn with_order(mut self, order: AggregateOrder) -> Self {
        self.order = order;
        self
    }

    pub fn label_style(&self) -> &LabelStyle {
        &self.style
    }

    /// Filter, trim, group, sum, label, then flag duplicate candidates.
    pub fn aggregate(&self, records: &[TimesheetRecord]) -> AggregationOutcome {
        let mut index: HashMap<AggregationKey, usize> = HashMap::new();
        let mut groups: Vec<(AggregationKey, f64)> = Vec::new();
        let mut dropped = 0usize;

        for record in records {
            let Some(hours) = record.positive_hours() else {
                dropped += 1;
                continue;
            };

            let key = record.key();
            match index.get(&key) {
                Some(&slot) => groups[slot].1 += hours,
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, hours));
                }
            }
        }

        let mut aggregated: Vec<AggregatedEntry> = groups
            .into_iter()
            .map(|(key, hours)| AggregatedEntry::from_key(key, hours, &self.style))
            .collect();
        sort_entries(&mut aggregated, self.order);

        let duplicates = find_duplicates(&aggregated);

        debug!(
            "Aggregated {} records into {} rows ({} dropped, {} duplicate candidates)",
            records.len(),
            aggregated.len(),
            dropped,
            duplicates.len()
        );

        AggregationOutcome {
            aggregated,
            duplicates,
            records_read: records.len(),
            records_dropped: dropped,
        }
    }

    /// Load the export at `path` and aggregate it in one step.
    pub fn aggregate_file(&self, path: &Path) -> Result<AggregationOutcome> {
        let records = load_source(path)?;
        Ok(self.aggregate(&records))
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

/// Aggregate `records` with `style`, returning `(aggregated, duplicates)`.
pub fn load_and_aggregate(
    records: &[TimesheetRecord],
    style: &LabelStyle,
) -> (Vec<AggregatedEntry>, Vec<AggregatedEntry>) {
    let outcome = TimesheetAggregator::new(style.clone()).aggregate(records);
    (outcome.aggregated, outcome.duplicates)
}

/// Every entry whose coarse key `(Employee, Project_No)` appears more than
/// once in `entries`, stably sorted by that coarse key.
pub fn find_duplicates(entries: &[AggregatedEntry]) -> Vec<AggregatedEntry> {
    let mut counts: HashMap<CoarseKey, usize> = HashMap::new();
    for entry in entries {
        *counts.entry(entry.coarse_key()).or_default() += 1;
    }

    let flagged: HashSet<CoarseKey> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(k, _)| k)
        .collect();

    let mut duplicates: Vec<AggregatedEntry> = entries
        .iter()
        .filter(|e| flagged.contains(&e.coarse_key()))
        .cloned()
        .collect();
    duplicates.sort_by(|a, b| {
        a.employee
            .cmp(&b.employee)
            .then_with(|| a.project_no.cmp(&b.project_no))
    });
    duplicates
}

/// Reorder `entries` in place. `FirstSeen` leaves them untouched.
pub fn sort_entries(entries: &mut [AggregatedEntry], order: AggregateOrder) {
    match order {
        AggregateOrder::FirstSeen => {}
        AggregateOrder::ByKey => entries.sort_by_key(|e| e.key()),
        AggregateOrder::ByHoursDesc => {
            entries.sort_by(|a, b| b.hours.total_cmp(&a.hours));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
