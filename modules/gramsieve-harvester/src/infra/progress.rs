use std::collections::HashSet;
use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::Context;
use gramsieve_common::{normalize_url, WorkItem};
use tracing::{error, info, warn};

/// Durable record of completed work items, backed by an append-only CSV
/// done-list (`url,completed_at`). The completed set is read once at open;
/// `mark_complete` appends and flushes under a lock so concurrent workers
/// never interleave rows.
///
/// Read failures are never fatal: an unreadable done-list means "no prior
/// progress" and the run reprocesses everything.
pub struct ProgressStore {
    done_file: PathBuf,
    completed: HashSet<String>,
    writer: Mutex<Option<csv::Writer<std::fs::File>>>,
}

impl ProgressStore {
    pub fn open(done_file: impl Into<PathBuf>) -> Self {
        let done_file = done_file.into();
        let completed = read_completed_set(&done_file);
        if !completed.is_empty() {
            info!(
                count = completed.len(),
                file = %done_file.display(),
                "loaded already completed URLs"
            );
        }
        Self {
            done_file,
            completed,
            writer: Mutex::new(None),
        }
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn is_completed(&self, url: &str) -> bool {
        self.completed.contains(&normalize_url(url))
    }

    /// Compute the pending list: every input URL not already completed,
    /// in input order, with cosmetic duplicates collapsed. An unreadable
    /// input file yields an empty list (logged as an error).
    pub fn load(&self, input_file: &Path) -> Vec<WorkItem> {
        let urls = match read_url_column(input_file) {
            Ok(urls) => urls,
            Err(err) => {
                error!(file = %input_file.display(), error = %err, "error reading input file");
                return Vec::new();
            }
        };
        let loaded = urls.len();

        let mut seen = HashSet::new();
        let mut pending = Vec::new();
        for url in urls {
            let normalized = normalize_url(&url);
            if self.completed.contains(&normalized) || !seen.insert(normalized) {
                continue;
            }
            pending.push(WorkItem::new(url.trim()));
        }

        info!(
            loaded,
            skipped = loaded - pending.len(),
            pending = pending.len(),
            "input list loaded"
        );
        pending
    }

    /// Append one completed item to the done-list and flush. Safe to call
    /// concurrently from multiple workers; an item recorded here is never
    /// reprocessed, even if the process dies right after this returns.
    pub fn mark_complete(&self, item: &WorkItem) -> anyhow::Result<()> {
        let mut guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(open_done_writer(&self.done_file)?);
        }
        if let Some(writer) = guard.as_mut() {
            writer
                .write_record([item.url.as_str(), &chrono::Utc::now().to_rfc3339()])
                .with_context(|| format!("appending {} to done-list", item.url))?;
            writer.flush().context("flushing done-list")?;
        }
        Ok(())
    }
}

fn open_done_writer(path: &Path) -> anyhow::Result<csv::Writer<std::fs::File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening done-list {}", path.display()))?;
    let is_new = file.metadata().map(|m| m.len() == 0).unwrap_or(false);

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(["url", "completed_at"])?;
        writer.flush()?;
    }
    Ok(writer)
}

/// Normalized URLs from the done-list. Anything unreadable (missing file,
/// garbage contents, absent `url` column) degrades to an empty set.
fn read_completed_set(path: &Path) -> HashSet<String> {
    if !path.exists() {
        return HashSet::new();
    }
    match read_url_column(path) {
        Ok(urls) => urls.iter().map(|u| normalize_url(u)).collect(),
        Err(err) => {
            warn!(file = %path.display(), error = %err, "done-list unreadable; treating as no prior progress");
            HashSet::new()
        }
    }
}

/// Values of the `url` column of a headed CSV file, in row order.
/// Malformed rows are skipped.
fn read_url_column(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let url_index = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == "url")
        .context("no `url` column in header")?;

    let mut urls = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else { continue };
        if let Some(url) = record.get(url_index) {
            if !url.trim().is_empty() {
                urls.push(url.to_string());
            }
        }
    }
    Ok(urls)
}

// ---------------------------------------------------------------------------
// Failure list
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Profile snapshot captured but flagged private.
    Private,
    /// No usable profile snapshot ever arrived.
    NoData,
    /// Unhandled per-item error.
    Error,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Private => "private",
            FailureReason::NoData => "no_data",
            FailureReason::Error => "error",
        };
        f.write_str(s)
    }
}

/// Shared list of permanently failed items, collected in memory during the
/// run and written once at the end, only when non-empty.
#[derive(Debug, Default)]
pub struct FailureLog {
    entries: Mutex<Vec<(String, FailureReason)>>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, url: &str, reason: FailureReason) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_string(), reason));
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn urls(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating failure list {}", path.display()))?;
        writer.write_record(["url", "reason"])?;
        for (url, reason) in entries.iter() {
            writer.write_record([url.as_str(), &reason.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    }
}
