//! Gmail API client for the spam sweep

use async_trait::async_trait;
use google_gmail1::{api::Message, hyper_rustls, hyper_util, Gmail};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::auth::MAIL_SCOPE;
use crate::error::{GmailError, Result};
use crate::models::{SpamMatch, SpamPage, TransportMessage};

/// Progress callback type for per-message progress
pub type ProgressCallback = Arc<dyn Fn() + Send + Sync>;

/// Upper bound on a single wait between retries
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Mail service operations the sweep depends on
///
/// Authentication and session renewal are the implementor's concern.
#[async_trait]
pub trait GmailClient: Send + Sync {
    /// List one page of messages matching `query`, continuing from `page_token`
    async fn list_spam(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<SpamPage>;

    /// Fetch a message in "raw" format
    async fn fetch_raw(&self, id: &str) -> Result<TransportMessage>;

    /// Send a complete message supplied in wire form
    async fn send_raw(&self, message: &TransportMessage) -> Result<()>;

    /// Permanently delete a message
    async fn delete_message(&self, id: &str) -> Result<()>;
}

/// Production Gmail client with bounded concurrency and retry for reads
pub struct ProductionGmailClient {
    hub: Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>,
    rate_limiter: Arc<Semaphore>,
    max_retries: u32,
}

impl ProductionGmailClient {
    /// Create a new production Gmail client
    ///
    /// # Arguments
    /// * `hub` - Gmail API hub instance
    /// * `max_concurrent` - Maximum concurrent API requests
    pub fn new(
        hub: Gmail<
            hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
        >,
        max_concurrent: usize,
    ) -> Self {
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            max_retries: 3,
        }
    }

    /// Email address of the authenticated account
    pub async fn profile_address(&self) -> Result<String> {
        let (_, profile) = self
            .hub
            .users()
            .get_profile("me")
            .add_scope(MAIL_SCOPE)
            .doit()
            .await?;

        profile
            .email_address
            .ok_or_else(|| GmailError::InvalidMessageFormat("Profile has no email address".to_string()))
    }

    async fn acquire_permit(&self) -> Result<tokio::sync::SemaphorePermit<'_>> {
        self.rate_limiter
            .acquire()
            .await
            .map_err(|e| GmailError::Unknown(format!("Failed to acquire rate limit permit: {}", e)))
    }

    /// Check if an error is retryable
    fn should_retry(error: &GmailError) -> bool {
        error.is_transient()
    }

    /// Delay before the next attempt, honouring a server supplied Retry-After
    fn retry_delay(error: &GmailError, backoff: Duration) -> Duration {
        match error {
            GmailError::RateLimitExceeded { retry_after } => {
                Duration::from_secs(*retry_after).clamp(backoff, MAX_RETRY_DELAY)
            }
            _ => backoff,
        }
    }

    /// Execute an async operation with exponential backoff retry
    ///
    /// Only used for read-only calls; sends and deletes are never retried.
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        initial_delay: Duration,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut backoff = initial_delay;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let delay = Self::retry_delay(&e, backoff);
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    backoff = std::cmp::min(backoff * 2, MAX_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Map a `messages.get` failure for message `id`
///
/// The hub decodes `raw` while deserializing the response, so a payload that
/// is not valid base64url surfaces as a JSON decode error. That is a property
/// of the message, not of the call, and is reported as `DecodeError`.
fn fetch_error(id: &str, error: google_gmail1::Error) -> GmailError {
    match error {
        google_gmail1::Error::JsonDecodeError(_, err) => GmailError::DecodeError {
            id: id.to_string(),
            reason: err.to_string(),
        },
        other => GmailError::from(other),
    }
}

#[async_trait]
impl GmailClient for ProductionGmailClient {
    async fn list_spam(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<SpamPage> {
        Self::with_retry("list_spam", self.max_retries, Duration::from_secs(1), || async {
            let _permit = self.acquire_permit().await?;

            let mut call = self
                .hub
                .users()
                .messages_list("me")
                .q(query)
                .max_results(page_size);

            if let Some(token) = page_token.as_deref().filter(|t| !t.is_empty()) {
                call = call.page_token(token);
            }

            debug!("Listing messages for query {:?}", query);
            let (_, response) = call.add_scope(MAIL_SCOPE).doit().await?;

            let matches = response
                .messages
                .unwrap_or_default()
                .into_iter()
                .filter_map(|m| m.id)
                .map(SpamMatch::new)
                .collect();

            Ok(SpamPage {
                matches,
                next_page_token: response.next_page_token,
            })
        })
        .await
    }

    async fn fetch_raw(&self, id: &str) -> Result<TransportMessage> {
        Self::with_retry("fetch_raw", self.max_retries, Duration::from_secs(1), || async {
            let _permit = self.acquire_permit().await?;

            let (_, message) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("raw")
                .add_scope(MAIL_SCOPE)
                .doit()
                .await
                .map_err(|e| fetch_error(id, e))?;

            // google-gmail1 already undoes the base64url layer of `raw`
            let raw = message.raw.ok_or_else(|| {
                GmailError::InvalidMessageFormat(format!("Message {} has no raw content", id))
            })?;
            debug!("Fetched message {} ({} bytes)", id, raw.len());

            Ok(TransportMessage::encode(&raw))
        })
        .await
    }

    async fn send_raw(&self, message: &TransportMessage) -> Result<()> {
        let bytes = message.decode().map_err(|e| {
            GmailError::InvalidMessageFormat(format!("Outgoing message is not base64url: {}", e))
        })?;
        let mime_type = "message/rfc822"
            .parse::<mime::Mime>()
            .map_err(|e| GmailError::Unknown(format!("Invalid MIME type: {}", e)))?;

        let _permit = self.acquire_permit().await?;
        let (_, sent) = self
            .hub
            .users()
            .messages_send(Message::default(), "me")
            .add_scope(MAIL_SCOPE)
            .upload(Cursor::new(bytes), mime_type)
            .await?;

        debug!("Report accepted as message {:?}", sent.id);
        Ok(())
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        let _permit = self.acquire_permit().await?;
        self.hub
            .users()
            .messages_delete("me", id)
            .add_scope(MAIL_SCOPE)
            .doit()
            .await?;

        Ok(())
    }
}

// Implement GmailClient for Arc<ProductionGmailClient> to allow shared ownership
#[async_trait]
impl GmailClient for Arc<ProductionGmailClient> {
    async fn list_spam(
        &self,
        query: &str,
        page_size: u32,
        page_token: Option<String>,
    ) -> Result<SpamPage> {
        self.as_ref().list_spam(query, page_size, page_token).await
    }

    async fn fetch_raw(&self, id: &str) -> Result<TransportMessage> {
        self.as_ref().fetch_raw(id).await
    }

    async fn send_raw(&self, message: &TransportMessage) -> Result<()> {
        self.as_ref().send_raw(message).await
    }

    async fn delete_message(&self, id: &str) -> Result<()> {
        self.as_ref().delete_message(id).await
    }
}
