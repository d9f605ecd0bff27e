//! Pure reconciliation of the scoped registry against the remote catalog.
//!
//! No I/O happens here: the function takes the scoped registry slice and
//! the fetched catalog and partitions every model into kept, demoted,
//! promoted or added. The settings layer turns the result into a patch,
//! the apply layer turns it into a report.

use crate::catalog::RemoteCatalog;
use crate::model::{ModelDescriptor, RegistryState};

/// Outcome of one reconciliation pass.
///
/// The prospective enabled section is `kept ++ re_enabled ++ added`; the
/// prospective disabled section is the untouched still-absent entries
/// followed by `moved_to_disabled`. Each sequence keeps its input order
/// (document order for existing entries, discovery order for additions),
/// so running the sync twice produces the same bytes the second time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationResult {
    /// Normalized base URL this result is scoped to.
    pub base_url: String,
    /// Enabled entries the endpoint still advertises.
    pub kept: Vec<ModelDescriptor>,
    /// Enabled entries the endpoint no longer advertises.
    pub moved_to_disabled: Vec<ModelDescriptor>,
    /// Disabled entries the endpoint advertises again, configs intact.
    pub re_enabled: Vec<ModelDescriptor>,
    /// Catalog ids unknown to both sections, materialized with defaults.
    pub added: Vec<ModelDescriptor>,
    /// Ids found in both sections; the stale disabled copy is discarded.
    pub dropped_duplicates: Vec<String>,
    /// Ids whose `requiresAPIKey` this pass flipped to `true`.
    pub requires_key_forced: Vec<String>,
}

impl ReconciliationResult {
    /// The prospective enabled sequence, in final document order.
    pub fn final_enabled(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.kept
            .iter()
            .chain(self.re_enabled.iter())
            .chain(self.added.iter())
    }

    /// True when applying this result would not change the settings file.
    pub fn is_noop(&self) -> bool {
        self.moved_to_disabled.is_empty()
            && self.re_enabled.is_empty()
            && self.added.is_empty()
            && self.dropped_duplicates.is_empty()
            && self.requires_key_forced.is_empty()
    }
}

/// Partition the scoped registry against the catalog.
///
/// Deterministic and side-effect free. An id present in both sections is
/// resolved before partitioning: the enabled copy wins and the disabled
/// copy is reported in `dropped_duplicates`. With `require_api_key` set,
/// every entry that ends up enabled gets `requiresAPIKey: true`; entries
/// staying disabled are left as they are.
pub fn reconcile(
    state: &RegistryState,
    catalog: &RemoteCatalog,
    require_api_key: bool,
) -> ReconciliationResult {
    let mut result = ReconciliationResult {
        base_url: state.base_url.clone(),
        ..Default::default()
    };

    for entry in &state.enabled {
        if catalog.contains(&entry.id) {
            result.kept.push(entry.clone());
        } else {
            result.moved_to_disabled.push(entry.clone());
        }
    }

    for entry in &state.disabled {
        if state.enabled.iter().any(|enabled| enabled.id == entry.id) {
            result.dropped_duplicates.push(entry.id.clone());
        } else if catalog.contains(&entry.id) {
            result.re_enabled.push(entry.clone());
        }
        // still absent from the catalog: stays parked, untouched
    }

    for id in catalog.ids() {
        let known = state.enabled.iter().any(|entry| entry.id == *id)
            || state.disabled.iter().any(|entry| entry.id == *id);
        if !known {
            result.added.push(
                ModelDescriptor::new(id, &state.base_url).with_requires_api_key(require_api_key),
            );
        }
    }

    if require_api_key {
        for entry in result.kept.iter_mut().chain(result.re_enabled.iter_mut()) {
            if entry.requires_api_key != Some(true) {
                entry.requires_api_key = Some(true);
                result.requires_key_forced.push(entry.id.clone());
            }
        }
    }

    result
}
