use anyhow::Result;
use clap::Parser;
use gmail_spam_reporter::auth::{self, MAIL_SCOPE};
use gmail_spam_reporter::cli::{self, Cli, Commands, ProgressReporter};
use gmail_spam_reporter::config::Config;
use gmail_spam_reporter::error::GmailError;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// A writer that prints through MultiProgress to avoid progress bar conflicts
#[derive(Clone)]
struct MultiProgressWriter {
    multi: Arc<MultiProgress>,
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MultiProgressWriter {
    fn new(multi: Arc<MultiProgress>) -> Self {
        Self {
            multi,
            buffer: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Write for MultiProgressWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut buffer = self
            .buffer
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "log buffer poisoned"))?;
        if !buffer.is_empty() {
            let msg = String::from_utf8_lossy(&buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                let _ = self.multi.println(msg);
            }
            buffer.clear();
        }
        Ok(())
    }
}

impl Drop for MultiProgressWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct MultiProgressMakeWriter {
    multi: Arc<MultiProgress>,
}

impl<'a> MakeWriter<'a> for MultiProgressMakeWriter {
    type Writer = MultiProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MultiProgressWriter::new(Arc::clone(&self.multi))
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.downcast_ref::<GmailError>().and_then(hint_for) {
            eprintln!("\n{}", hint);
        }
        eprintln!("\nFor help, run: spam-sweep --help");
        process::exit(1);
    }
}

/// Extra guidance for errors the user can act on
fn hint_for(error: &GmailError) -> Option<&'static str> {
    match error {
        GmailError::AuthError(_) => Some(
            "Check credentials.json (or GMAIL_CLIENT_ID / GMAIL_CLIENT_SECRET) and run `spam-sweep auth --force`.",
        ),
        GmailError::Forbidden(_) => Some(
            "The cached token may lack the full mailbox scope; run `spam-sweep auth --force`.",
        ),
        GmailError::DeleteFailed { .. } => Some(
            "The report for this message was already sent. Delete it by hand before the next sweep to avoid a duplicate report.",
        ),
        GmailError::ConfigError(_) => Some("Run `spam-sweep init-config` to write a config file with every default filled in."),
        _ => None,
    }
}

async fn run() -> Result<()> {
    // Several dependencies pull in rustls; pick one provider explicitly
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_spam_reporter=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_spam_reporter=info,warn"))
    };

    // Logs print above progress bars
    let multi_progress = Arc::new(MultiProgress::new());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(MultiProgressMakeWriter {
            multi: Arc::clone(&multi_progress),
        })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");

            if force && cli.token_cache.exists() {
                tokio::fs::remove_file(&cli.token_cache).await?;
                tracing::info!("Removed existing token cache");
            }

            let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", cli.token_cache);

            // Same scope as the sweep so no second consent is triggered
            let (_, profile) = hub
                .users()
                .get_profile("me")
                .add_scope(MAIL_SCOPE)
                .doit()
                .await
                .map_err(GmailError::from)?;
            println!(
                "Connected to account: {}",
                profile.email_address.unwrap_or_default()
            );

            Ok(())
        }

        Commands::Sweep {
            dry_run,
            owner,
            destination,
            query,
            json,
        } => {
            let reporter = ProgressReporter::with_multi_progress((*multi_progress).clone());

            let config_spinner = reporter.add_spinner("Loading configuration...");
            let mut config = Config::load(&cli.config).await?;
            cli::apply_sweep_overrides(&mut config, dry_run, owner, destination, query)?;
            reporter.finish_spinner(
                &config_spinner,
                &format!("Configuration loaded (reports to {})", config.report.destination),
            );

            if config.sweep.dry_run {
                let _ = reporter
                    .multi_progress()
                    .println("Running in DRY RUN mode - nothing will be sent or deleted");
            }

            let summary = cli::run_sweep(&cli.credentials, &cli.token_cache, &config, &reporter).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", cli::format_summary(&summary));
            }

            Ok(())
        }

        Commands::InitConfig { output, force } => {
            tracing::info!("Generating example configuration file");

            if output.exists() && !force {
                return Err(GmailError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(&output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nPlease edit this file to customize your settings.");
            println!("Key settings to review:");
            println!("  - report.destination: Where spam reports are sent");
            println!("  - report.owner_address: From address (empty = authenticated account)");
            println!("  - report.attachment_encoding: 'base64' or 'verbatim'");
            println!("  - sweep.query: Which messages count as spam");

            Ok(())
        }
    }
}
