//! Gmail Spam Reporter
//!
//! Sweeps the spam folder of a Gmail account, forwards every match to an
//! abuse desk as an RFC822 attachment and deletes the original once the
//! report has been accepted.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 installed-app flow with token caching
//! - **Listing**: paged spam query, followed cursor by cursor
//! - **Reporting**: multipart/mixed report around the untouched original
//! - **Deletion**: only after a confirmed send; a failed delete stops the sweep
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_spam_reporter::{auth, client::ProductionGmailClient, config::Config, SpamSweep};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref()).await?;
//!
//!     let hub = auth::initialize_gmail_hub(
//!         "credentials.json".as_ref(),
//!         ".spam-reporter/token.json".as_ref(),
//!     )
//!     .await?;
//!     let client = ProductionGmailClient::new(hub, config.sweep.max_concurrent_requests);
//!     let owner = client.profile_address().await?;
//!
//!     let summary = SpamSweep::new(&client, config.report.builder(&owner), &config.sweep)
//!         .run()
//!         .await?;
//!     println!("{} reports sent", summary.reports_sent);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Gmail client trait and the rate-limited production client
//! - [`cli`] - Command-line interface and sweep orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures
//! - [`report`] - MIME report construction
//! - [`sweep`] - The list/fetch/report/send/delete pipeline
//! - [`token`] - Random tokens for MIME boundaries

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod sweep;
pub mod token;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

// Core data models
pub use models::{SpamMatch, SpamPage, SweepSummary, TransportMessage};

// Config types
pub use config::{Config, ReportConfig, SweepConfig};

// Client traits
pub use client::{GmailClient, ProductionGmailClient};

// Pipeline
pub use report::{AttachmentEncoding, ReportBuilder};
pub use sweep::{MessageOutcome, SpamSweep};
pub use token::Alphabet;

// CLI types (for binary usage)
pub use cli::{Cli, Commands, ProgressReporter};
