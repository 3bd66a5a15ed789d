//! Command-line interface

use clap::{Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::auth;
use crate::client::{GmailClient, ProductionGmailClient, ProgressCallback};
use crate::config::Config;
use crate::error::{GmailError, Result};
use crate::models::SweepSummary;
use crate::sweep::SpamSweep;

#[derive(Parser, Debug)]
#[command(name = "spam-sweep")]
#[command(version)]
#[command(about = "Report Gmail spam to an abuse desk and delete it", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".spam-reporter/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Force re-authentication even if token exists
        #[arg(long)]
        force: bool,
    },

    /// Report and delete every message matching the spam query
    Sweep {
        /// Build reports but don't send or delete anything
        #[arg(long)]
        dry_run: bool,

        /// From address for reports (defaults to the authenticated account)
        #[arg(long)]
        owner: Option<String>,

        /// Where reports are sent
        #[arg(long)]
        destination: Option<String>,

        /// Override the listing query
        #[arg(long)]
        query: Option<String>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        Self {
            multi,
            spinner_style,
        }
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }
}

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_sweep_overrides(
    config: &mut Config,
    dry_run: bool,
    owner: Option<String>,
    destination: Option<String>,
    query: Option<String>,
) -> Result<()> {
    if dry_run {
        config.sweep.dry_run = true;
    }
    if let Some(owner) = owner {
        config.report.owner_address = owner;
    }
    if let Some(destination) = destination {
        config.report.destination = destination;
    }
    if let Some(query) = query {
        config.sweep.query = query;
    }
    config.validate()
}

/// Resolve the From address, asking the account profile when unset
pub async fn resolve_owner_address(
    config: &Config,
    client: &ProductionGmailClient,
) -> Result<String> {
    let configured = config.report.owner_address.trim();
    if !configured.is_empty() {
        return Ok(configured.to_string());
    }

    let address = client.profile_address().await?;
    info!("Using account address {} as report sender", address);
    Ok(address)
}

/// Run one sweep against an already authenticated client
pub async fn run_sweep_with_client(
    config: &Config,
    client: &dyn GmailClient,
    owner_address: &str,
    reporter: &ProgressReporter,
) -> Result<SweepSummary> {
    let spinner = reporter.add_spinner("Sweeping spam folder...");
    let tick = spinner.clone();
    let on_progress: ProgressCallback = Arc::new(move || {
        tick.inc(1);
        tick.set_message(format!("Processed {} messages", tick.position()));
    });

    let sweep = SpamSweep::new(client, config.report.builder(owner_address), &config.sweep)
        .with_progress(on_progress);

    match sweep.run().await {
        Ok(summary) => {
            reporter.finish_spinner(
                &spinner,
                &format!("Processed {} messages", summary.matches),
            );
            Ok(summary)
        }
        Err(e) => {
            spinner.abandon_with_message("Sweep aborted");
            Err(e)
        }
    }
}

/// Authenticate, then run one sweep
pub async fn run_sweep(
    credentials: &Path,
    token_cache: &Path,
    config: &Config,
    reporter: &ProgressReporter,
) -> Result<SweepSummary> {
    let auth_spinner = reporter.add_spinner("Authenticating with Gmail API...");
    let hub = auth::initialize_gmail_hub(credentials, token_cache).await?;
    reporter.finish_spinner(&auth_spinner, "Gmail API authenticated");

    let client = ProductionGmailClient::new(hub, config.sweep.max_concurrent_requests);
    let owner_address = resolve_owner_address(config, &client).await?;
    if owner_address.trim().is_empty() {
        return Err(GmailError::ConfigError(
            "report.owner_address could not be determined".to_string(),
        ));
    }

    run_sweep_with_client(config, &client, &owner_address, reporter).await
}

/// Human readable summary lines
pub fn format_summary(summary: &SweepSummary) -> String {
    let mut out = String::new();
    out.push_str("\n========================================\n");
    if summary.dry_run {
        out.push_str("Spam Sweep Summary (dry run)\n");
    } else {
        out.push_str("Spam Sweep Summary\n");
    }
    out.push_str("========================================\n");
    out.push_str(&format!("Run ID: {}\n", summary.run_id));
    out.push_str(&format!("Duration: {} seconds\n", summary.duration_seconds()));
    out.push_str(&format!("Pages listed: {}\n", summary.pages));
    out.push_str(&format!("Messages matched: {}\n", summary.matches));
    if summary.dry_run {
        out.push_str(&format!("Reports that would be sent: {}\n", summary.would_send));
    } else {
        out.push_str(&format!("Reports sent: {}\n", summary.reports_sent));
        out.push_str(&format!("Messages deleted: {}\n", summary.messages_deleted));
        out.push_str(&format!("Send failures: {}\n", summary.send_failures));
    }
    out.push_str(&format!("Skipped (undecodable): {}\n", summary.skipped));
    out.push_str("========================================");
    out
}
