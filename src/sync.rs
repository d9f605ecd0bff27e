//! The one-shot sync pipeline.
//!
//! `run` wires the stages together in strict sequence: fetch the catalog,
//! load the settings, scope the registry, reconcile, apply. The first
//! failure aborts the run; nothing is written unless the catalog fetch and
//! the settings parse both succeeded.

use std::path::PathBuf;

use tracing::info;

use crate::apply::{self, ApplyOutcome};
use crate::catalog::CatalogClient;
use crate::error::Result;
use crate::reconcile;
use crate::settings::{self, SettingsDocument};

/// Options for one sync run.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Endpoint host as given on the command line; normalized internally.
    pub host: String,
    /// Explicit settings file location; discovered per platform when `None`.
    pub settings_path: Option<PathBuf>,
    /// Target the VS Code Insiders settings location.
    pub insiders: bool,
    /// Bearer credential for the catalog request.
    pub api_key: Option<String>,
    /// Force `requiresAPIKey: true` on every model that ends up enabled.
    pub api_key_required: bool,
    /// Report the changes without touching the filesystem.
    pub dry_run: bool,
}

/// Report of a completed run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Settings file the run targeted.
    pub settings_path: PathBuf,
    /// Normalized endpoint base URL.
    pub base_url: String,
    /// Number of models the endpoint advertised.
    pub catalog_size: usize,
    /// Summary, backup location and dry-run flag.
    pub outcome: ApplyOutcome,
}

/// Run the sync once.
pub async fn run(options: &SyncOptions) -> Result<SyncReport> {
    let settings_path = match &options.settings_path {
        Some(path) => path.clone(),
        None => settings::settings_path(options.insiders)?,
    };

    let client = CatalogClient::new(&options.host, options.api_key.clone());
    info!(base_url = %client.base_url(), "fetching model catalog");
    let catalog = client.fetch().await?;

    let doc = SettingsDocument::load(&settings_path)?;
    let state = doc.registry_state(client.base_url())?;
    info!(
        path = %settings_path.display(),
        enabled = state.enabled.len(),
        disabled = state.disabled.len(),
        "loaded settings"
    );

    let result = reconcile::reconcile(&state, &catalog, options.api_key_required);
    let outcome = apply::apply(&doc, &settings_path, &result, options.dry_run)?;

    Ok(SyncReport {
        settings_path,
        base_url: client.base_url().to_string(),
        catalog_size: catalog.len(),
        outcome,
    })
}
