//! `copilot-sync` — sync VS Code Copilot custom models with an endpoint.
//!
//! Fetches the model listing of an OpenAI-compatible host, compares it with
//! the `github.copilot.chat.customOAIModels` sections of the VS Code user
//! settings, then disables vanished models, re-enables returned ones and
//! adds new ones. The settings file is backed up before every write;
//! `--dry-run` prints the changes instead.
//!
//! Build: `cargo build --bin copilot-sync` (the `cli` feature is on by
//! default).

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;

use copilot_sync::{SyncOptions, SyncReport, sync, version_string};

// ── CLI ─────────────────────────────────────────────────────────────

/// Sync VS Code Copilot custom model lists with an OpenAI-compatible endpoint
#[derive(Parser)]
#[command(name = "copilot-sync")]
#[command(version = copilot_sync::PKG_VERSION)]
#[command(about = "sync VS Code Copilot custom models with an OpenAI-compatible endpoint")]
struct Args {
    /// Endpoint host, e.g. "http://localhost:8080" or "http://localhost:8080/v1"
    #[arg(long)]
    host: String,

    /// Target the VS Code Insiders settings file
    #[arg(long)]
    insiders: bool,

    /// Print the changes without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Force requiresAPIKey=true on every model at this endpoint
    #[arg(long)]
    api_key_required: bool,

    /// Bearer token for the model listing request
    #[arg(long, env = "COPILOT_SYNC_API_KEY")]
    api_key: Option<String>,

    /// Settings file to patch (default: the per-platform VS Code location)
    #[arg(long, env = "COPILOT_SYNC_SETTINGS")]
    settings_path: Option<PathBuf>,
}

// ── report output ───────────────────────────────────────────────────

fn print_report(report: &SyncReport) {
    println!(
        "endpoint: {} ({} models)",
        report.base_url, report.catalog_size
    );
    println!("settings: {}", report.settings_path.display());
    print!("{}", report.outcome.summary);

    if report.outcome.dry_run {
        println!("dry run, nothing written");
    } else if let Some(ref backup) = report.outcome.backup_path {
        println!("backup: {}", backup.display());
    }
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    info!(version = version_string(), "copilot-sync starting");
    let options = SyncOptions {
        host: args.host,
        settings_path: args.settings_path,
        insiders: args.insiders,
        api_key: args.api_key,
        api_key_required: args.api_key_required,
        dry_run: args.dry_run,
    };

    match sync::run(&options).await {
        Ok(report) => print_report(&report),
        Err(e) => {
            eprintln!("error ({}): {e}", e.category());
            process::exit(1);
        }
    }
}
