//! copilot-sync - keep VS Code Copilot custom models in step with a live endpoint
//!
//! This crate reconciles the `github.copilot.chat.customOAIModels` sections
//! of a VS Code settings file against the model listing of an
//! OpenAI-compatible endpoint: models the endpoint stopped serving move to
//! the disabled section (configs intact), previously disabled models that
//! reappear move back, and brand-new models are added with defaults. Only
//! entries whose `baseUrl` matches the target endpoint are touched, so
//! several endpoints can share one settings file.
//!
//! # Example
//!
//! ```rust,no_run
//! use copilot_sync::{sync, SyncOptions};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> copilot_sync::Result<()> {
//!     let report = sync::run(&SyncOptions {
//!         host: "http://localhost:8080".to_string(),
//!         dry_run: true,
//!         ..Default::default()
//!     })
//!     .await?;
//!
//!     print!("{}", report.outcome.summary);
//!     Ok(())
//! }
//! ```

pub mod apply;
pub mod catalog;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod settings;
pub mod sync;
mod version;

// Re-export main types at crate root
pub use apply::{ApplyOutcome, ChangeSummary, backup_settings};
pub use catalog::{CatalogClient, RemoteCatalog, normalize_base_url};
pub use error::{Result, SyncError};
pub use model::{ModelDescriptor, RegistryState};
pub use reconcile::{ReconciliationResult, reconcile};
pub use settings::{DISABLED_KEY, ENABLED_KEY, SettingsDocument, settings_path};
pub use sync::{SyncOptions, SyncReport};
pub use version::{GIT_SHA, PKG_VERSION, version_string};
