//! Applying a reconciliation to disk: summary, backup, write.
//!
//! The order is fixed: patch in memory, back the file up, then rename the
//! new content into place. A failing backup aborts before anything is
//! mutated; a failing write leaves the backup behind for manual recovery.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{Result, SyncError};
use crate::reconcile::ReconciliationResult;
use crate::settings::SettingsDocument;

/// Human-readable change report for one run.
///
/// Id lists are sorted case-insensitively for stable display; the
/// underlying document order is unaffected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSummary {
    pub kept: Vec<String>,
    pub disabled: Vec<String>,
    pub re_enabled: Vec<String>,
    pub added: Vec<String>,
    pub dropped_duplicates: Vec<String>,
    pub requires_key_forced: Vec<String>,
    /// Catalog ids not added because another endpoint's entry holds the id.
    pub skipped: Vec<String>,
}

impl ChangeSummary {
    /// Build the display summary from a reconciliation result.
    pub fn from_result(result: &ReconciliationResult) -> Self {
        let sorted_ids = |entries: &[crate::model::ModelDescriptor]| {
            let mut ids: Vec<String> = entries.iter().map(|entry| entry.id.clone()).collect();
            sort_for_display(&mut ids);
            ids
        };

        let mut dropped_duplicates = result.dropped_duplicates.clone();
        sort_for_display(&mut dropped_duplicates);
        let mut requires_key_forced = result.requires_key_forced.clone();
        sort_for_display(&mut requires_key_forced);

        Self {
            kept: sorted_ids(&result.kept),
            disabled: sorted_ids(&result.moved_to_disabled),
            re_enabled: sorted_ids(&result.re_enabled),
            added: sorted_ids(&result.added),
            dropped_duplicates,
            requires_key_forced,
            skipped: Vec::new(),
        }
    }

    /// Record catalog ids the patch could not add because the id is held by
    /// another endpoint's entry; they move from `added` to `skipped`.
    pub fn note_skipped(&mut self, mut skipped: Vec<String>) {
        self.added.retain(|id| !skipped.contains(id));
        sort_for_display(&mut skipped);
        self.skipped = skipped;
    }

    /// True when the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.disabled.is_empty()
            && self.re_enabled.is_empty()
            && self.added.is_empty()
            && self.dropped_duplicates.is_empty()
            && self.requires_key_forced.is_empty()
    }
}

impl fmt::Display for ChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            writeln!(f, "models already in sync ({} kept)", self.kept.len())?;
        } else {
            if !self.kept.is_empty() {
                writeln!(f, "kept: {} unchanged", self.kept.len())?;
            }
            list_line(f, "disabled", &self.disabled)?;
            list_line(f, "re-enabled", &self.re_enabled)?;
            list_line(f, "added", &self.added)?;
            list_line(f, "dropped stale duplicates", &self.dropped_duplicates)?;
            list_line(f, "requiresAPIKey forced", &self.requires_key_forced)?;
        }
        list_line(f, "skipped (id held by another endpoint)", &self.skipped)?;
        Ok(())
    }
}

fn list_line(f: &mut fmt::Formatter<'_>, label: &str, ids: &[String]) -> fmt::Result {
    if ids.is_empty() {
        return Ok(());
    }
    writeln!(f, "{label} ({}): {}", ids.len(), ids.join(", "))
}

/// Sort ids the way the report lists them.
fn sort_for_display(ids: &mut [String]) {
    ids.sort_by_key(|id| id.to_lowercase());
}

/// What one apply step did.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyOutcome {
    pub summary: ChangeSummary,
    /// Backup location; `None` on dry runs.
    pub backup_path: Option<PathBuf>,
    pub dry_run: bool,
}

/// Copy the settings file to a timestamped sibling.
///
/// `settings.json` becomes `settings.json.backup.YYYYMMDD_HHMMSS`. Failure
/// here is terminal for the run, so the original is never touched without
/// a fallback on disk.
pub fn backup_settings(path: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!(".backup.{timestamp}"));
    let backup_path = path.with_file_name(name);

    fs::copy(path, &backup_path).map_err(|e| {
        SyncError::Backup(format!(
            "failed to copy {} → {}: {e}",
            path.display(),
            backup_path.display()
        ))
    })?;
    Ok(backup_path)
}

/// Apply a reconciliation to the settings file at `path`.
///
/// The patched document and the summary are always computed; a dry run
/// stops there and reports what would have happened.
pub fn apply(
    doc: &SettingsDocument,
    path: &Path,
    result: &ReconciliationResult,
    dry_run: bool,
) -> Result<ApplyOutcome> {
    let mut patched = doc.clone();
    let skipped = patched.apply_result(result)?;
    if !skipped.is_empty() {
        warn!(ids = ?skipped, "catalog ids held by another endpoint's entries, not added");
    }
    let mut summary = ChangeSummary::from_result(result);
    summary.note_skipped(skipped);

    if dry_run {
        info!("dry run, settings left untouched");
        return Ok(ApplyOutcome {
            summary,
            backup_path: None,
            dry_run: true,
        });
    }

    let backup_path = backup_settings(path)?;
    info!(backup = %backup_path.display(), "settings backed up");
    patched.save(path)?;
    info!(path = %path.display(), "settings updated");

    Ok(ApplyOutcome {
        summary,
        backup_path: Some(backup_path),
        dry_run: false,
    })
}
