//! Spam sweep pipeline
//!
//! One sweep walks every page of the spam query. For each match it fetches
//! the raw message, wraps it in a report, sends the report and deletes the
//! original only once the send was accepted.
//!
//! Failure policy:
//! - listing, fetch and delete-after-send failures end the sweep with `Err`
//! - a send failure leaves the message in place and moves on
//! - a raw payload that does not decode is skipped and left in place

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{GmailClient, ProgressCallback};
use crate::config::SweepConfig;
use crate::error::{GmailError, Result};
use crate::models::{SpamMatch, SweepSummary, TransportMessage};
use crate::report::ReportBuilder;
use crate::token;

/// What happened to a single match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Report sent and original deleted
    Reported,
    /// Report built but not sent (dry run)
    WouldReport,
    /// Send was rejected; original kept
    SendFailed,
    /// Raw content unusable; original kept
    Skipped,
}

impl SweepSummary {
    fn record(&mut self, outcome: MessageOutcome) {
        match outcome {
            MessageOutcome::Reported => {
                self.reports_sent += 1;
                self.messages_deleted += 1;
            }
            MessageOutcome::WouldReport => self.would_send += 1,
            MessageOutcome::SendFailed => self.send_failures += 1,
            MessageOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// Drives one sweep over the spam query
pub struct SpamSweep<'a> {
    client: &'a dyn GmailClient,
    reports: ReportBuilder,
    query: String,
    page_size: u32,
    max_concurrent: usize,
    dry_run: bool,
    on_progress: Option<ProgressCallback>,
}

impl<'a> SpamSweep<'a> {
    pub fn new(client: &'a dyn GmailClient, reports: ReportBuilder, config: &SweepConfig) -> Self {
        Self {
            client,
            reports,
            query: config.query.clone(),
            page_size: config.page_size,
            max_concurrent: config.max_concurrent_messages.max(1),
            dry_run: config.dry_run,
            on_progress: None,
        }
    }

    /// Invoke `callback` once per processed match
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Run the sweep from the first page until the cursor runs out
    pub async fn run(&self) -> Result<SweepSummary> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("sweep", run_id = %run_id);

        async move {
            let mut summary = SweepSummary::new(run_id, self.dry_run);
            let mut seen: HashSet<String> = HashSet::new();
            let mut cursor: Option<String> = None;

            info!(
                "Starting sweep for query {:?} (reports to {})",
                self.query, self.reports.to
            );
            if self.dry_run {
                info!("Dry run: nothing will be sent or deleted");
            }

            loop {
                let page = self
                    .client
                    .list_spam(&self.query, self.page_size, cursor.clone())
                    .await
                    .map_err(|e| {
                        error!("Unable to retrieve messages: {}", e);
                        e
                    })?;
                summary.pages += 1;

                let fresh: Vec<&SpamMatch> = page
                    .matches
                    .iter()
                    .filter(|m| {
                        let first_time = seen.insert(m.id.clone());
                        if !first_time {
                            debug!("Message {} already handled in this sweep", m.id);
                        }
                        first_time
                    })
                    .collect();

                info!("Processing {} messages...", fresh.len());
                summary.matches += fresh.len();

                let mut outcomes = stream::iter(fresh)
                    .map(|m| self.process_match(m))
                    .buffered(self.max_concurrent);

                while let Some(outcome) = outcomes.next().await {
                    summary.record(outcome?);
                    if let Some(on_progress) = &self.on_progress {
                        on_progress();
                    }
                }

                match page.next_cursor() {
                    Some(next) => cursor = Some(next.to_string()),
                    None => break,
                }
            }

            summary.finished_at = Some(Utc::now());
            info!(
                "Sweep finished: {} pages, {} matches, {} reported, {} held back, {} deleted, {} send failures, {} skipped",
                summary.pages,
                summary.matches,
                summary.reports_sent,
                summary.would_send,
                summary.messages_deleted,
                summary.send_failures,
                summary.skipped
            );
            Ok::<SweepSummary, GmailError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Fetch, report, send and conditionally delete one match
    ///
    /// Returns `Err` only for failures that must end the sweep.
    pub async fn process_match(&self, spam: &SpamMatch) -> Result<MessageOutcome> {
        let raw = match self.client.fetch_raw(&spam.id).await {
            Ok(raw) => raw,
            Err(err @ GmailError::DecodeError { .. }) => {
                warn!("{}; leaving message in place", err);
                return Ok(MessageOutcome::Skipped);
            }
            Err(e) => {
                error!("Unable to retrieve message {}: {}", spam.id, e);
                return Err(e);
            }
        };

        let original = match raw.decode() {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = GmailError::DecodeError {
                    id: spam.id.clone(),
                    reason: e.to_string(),
                };
                warn!("{}; leaving message in place", err);
                return Ok(MessageOutcome::Skipped);
            }
        };

        let boundary = token::boundary();
        let report = TransportMessage::encode(&self.reports.build(&original, &boundary));

        if self.dry_run {
            info!(
                "Would send report for message {} ({} bytes)",
                spam.id,
                original.len()
            );
            return Ok(MessageOutcome::WouldReport);
        }

        if let Err(e) = self.client.send_raw(&report).await {
            let err = GmailError::SendFailed {
                id: spam.id.clone(),
                reason: e.to_string(),
            };
            warn!("{}; leaving message in place", err);
            return Ok(MessageOutcome::SendFailed);
        }
        info!("Report sent for message {}", spam.id);

        self.client
            .delete_message(&spam.id)
            .await
            .map_err(|e| {
                let err = GmailError::DeleteFailed {
                    id: spam.id.clone(),
                    reason: e.to_string(),
                };
                error!("{}", err);
                err
            })?;
        info!("Deleted message {}", spam.id);

        Ok(MessageOutcome::Reported)
    }
}
