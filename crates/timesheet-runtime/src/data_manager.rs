//! Memoising data manager for the timesheet source.
//!
//! Wraps the reader and [`TimesheetAggregator`] with a cache keyed on the
//! source file's content. Callers use [`DataManager::get_data`] to obtain the
//! current [`AggregationOutcome`]; the file is re-read on every call but only
//! re-aggregated when its SHA-256 digest changed (or a refresh is forced).

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};
use timesheet_core::{Result, TimesheetError};
use timesheet_data::aggregator::{AggregationOutcome, TimesheetAggregator};
use timesheet_data::reader::parse_document;

// ── SourceFingerprint ─────────────────────────────────────────────────────────

/// Identifies one version of the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    /// Lower-case hex SHA-256 of the file content.
    pub digest: String,
    /// File size in bytes.
    pub len: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<DateTime<Local>>,
}

impl SourceFingerprint {
    /// Fingerprint raw content. `modified` is informational only.
    pub fn of_bytes(bytes: &[u8], modified: Option<DateTime<Local>>) -> Self {
        Self {
            digest: hex::encode(Sha256::digest(bytes)),
            len: bytes.len() as u64,
            modified,
        }
    }

    /// `true` when both fingerprints describe the same content.
    pub fn same_content(&self, other: &SourceFingerprint) -> bool {
        self.len == other.len && self.digest == other.digest
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> &str {
        &self.digest[..self.digest.len().min(12)]
    }
}

// ── DataManager ───────────────────────────────────────────────────────────────

struct CachedOutcome {
    fingerprint: SourceFingerprint,
    outcome: AggregationOutcome,
    loaded_at: Instant,
}

/// Content-keyed cache around the load-and-aggregate pipeline.
///
/// # Example
/// ```no_run
/// use timesheet_runtime::data_manager::DataManager;
/// use timesheet_data::aggregator::TimesheetAggregator;
///
/// let mut mgr = DataManager::new("data.json", TimesheetAggregator::default());
/// if let Ok(outcome) = mgr.get_data(false) {
///     println!("rows: {}", outcome.aggregated.len());
/// }
/// ```
pub struct DataManager {
    source: PathBuf,
    aggregator: TimesheetAggregator,
    cache: Option<CachedOutcome>,
    /// Human-readable description of the last error encountered.
    last_error: Option<String>,
    /// Number of aggregation passes run so far.
    aggregations: usize,
}

impl DataManager {
    pub fn new(source: impl Into<PathBuf>, aggregator: TimesheetAggregator) -> Self {
        Self {
            source: source.into(),
            aggregator,
            cache: None,
            last_error: None,
            aggregations: 0,
        }
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Return the aggregated data for the current file content.
    ///
    /// The file is read and hashed on every call. Aggregation reruns only
    /// when the content changed or `force_refresh` is `true`. A failed load
    /// is returned as an error and recorded in [`last_error`](Self::last_error);
    /// the previously cached outcome is kept.
    pub fn get_data(&mut self, force_refresh: bool) -> Result<&AggregationOutcome> {
        if let Err(e) = self.load(force_refresh) {
            tracing::warn!(error = %e, source = %self.source.display(), "reload failed");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        self.cached()
            .ok_or_else(|| TimesheetError::InvalidDocument("no data loaded".to_string()))
    }

    /// The last successfully loaded outcome, without touching the file.
    pub fn cached(&self) -> Option<&AggregationOutcome> {
        self.cache.as_ref().map(|c| &c.outcome)
    }

    /// Fingerprint of the content behind [`cached`](Self::cached).
    pub fn fingerprint(&self) -> Option<&SourceFingerprint> {
        self.cache.as_ref().map(|c| &c.fingerprint)
    }

    /// Drop the memo so the next [`get_data`](Self::get_data) re-aggregates.
    pub fn invalidate_cache(&mut self) {
        self.cache = None;
        tracing::debug!("cache invalidated");
    }

    /// Time since the cached outcome was produced.
    pub fn cache_age(&self) -> Option<Duration> {
        self.cache.as_ref().map(|c| c.loaded_at.elapsed())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn aggregation_count(&self) -> usize {
        self.aggregations
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn load(&mut self, force_refresh: bool) -> Result<()> {
        let (bytes, fingerprint) = read_source(&self.source)?;

        let unchanged = self
            .cache
            .as_ref()
            .is_some_and(|c| c.fingerprint.same_content(&fingerprint));
        if unchanged && !force_refresh {
            tracing::debug!(digest = fingerprint.short(), "source unchanged; using cache");
            return Ok(());
        }

        let content = std::str::from_utf8(&bytes).map_err(|e| {
            TimesheetError::InvalidDocument(format!("source is not valid UTF-8: {e}"))
        })?;
        let records = parse_document(content)?;
        let outcome = self.aggregator.aggregate(&records);
        self.aggregations += 1;

        tracing::info!(
            digest = fingerprint.short(),
            bytes = fingerprint.len,
            rows = outcome.aggregated.len(),
            dropped = outcome.records_dropped,
            "source aggregated"
        );

        self.cache = Some(CachedOutcome {
            fingerprint,
            outcome,
            loaded_at: Instant::now(),
        });
        Ok(())
    }
}

fn read_source(path: &Path) -> Result<(Vec<u8>, SourceFingerprint)> {
    if !path.exists() {
        return Err(TimesheetError::MissingSourceFile(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| TimesheetError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Local>::from);
    let fingerprint = SourceFingerprint::of_bytes(&bytes, modified);
    Ok((bytes, fingerprint))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
