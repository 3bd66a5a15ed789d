use base64::{
    alphabet,
    engine::{general_purpose::URL_SAFE, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// URL-safe decoder that tolerates both padded and unpadded input
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A spam-classified message pending processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpamMatch {
    pub id: String,
}

impl SpamMatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One page of listing results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpamPage {
    pub matches: Vec<SpamMatch>,
    pub next_page_token: Option<String>,
}

impl SpamPage {
    /// The cursor for the next listing call, if there is one
    ///
    /// An empty token is treated the same as a missing one.
    pub fn next_cursor(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A whole RFC 2822 message in the API's wire form (URL-safe base64)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage(String);

impl TransportMessage {
    /// Wrap an already encoded payload
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encode raw message bytes with the URL-safe alphabet
    ///
    /// The standard alphabet is rejected by the Gmail API.
    pub fn encode(bytes: &[u8]) -> Self {
        Self(URL_SAFE.encode(bytes))
    }

    pub fn decode(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE_LENIENT.decode(self.0.trim_end())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome counters for one sweep
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub pages: usize,
    pub matches: usize,
    pub reports_sent: usize,
    /// Reports built but held back by a dry run
    #[serde(default)]
    pub would_send: usize,
    pub messages_deleted: usize,
    pub send_failures: usize,
    pub skipped: usize,
}

impl SweepSummary {
    pub fn new(run_id: impl Into<String>, dry_run: bool) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            pages: 0,
            matches: 0,
            reports_sent: 0,
            would_send: 0,
            messages_deleted: 0,
            send_failures: 0,
            skipped: 0,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds()
    }
}
