//! Common test utilities and fixtures

#![allow(dead_code)]

use gmail_spam_reporter::client::GmailClient;
use gmail_spam_reporter::config::SweepConfig;
use gmail_spam_reporter::error::Result;
use gmail_spam_reporter::models::{SpamMatch, SpamPage, TransportMessage};
use gmail_spam_reporter::report::ReportBuilder;
use mockall::mock;

pub const OWNER: &str = "me@example.com";
pub const ABUSE_DESK: &str = "abuse@example.org";

/// A small RFC822 message with CRLF line endings, as Gmail stores it
pub fn create_raw_message(id: &str) -> Vec<u8> {
    format!(
        "Return-Path: <bounce@spammer.test>\r\n\
         From: \"Prize Desk\" <winner@spammer.test>\r\n\
         To: me@example.com\r\n\
         Subject: You won {}\r\n\
         Message-ID: <{}@spammer.test>\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         Claim your prize now.\r\n",
        id, id
    )
    .into_bytes()
}

/// Wire form of `create_raw_message`
pub fn create_transport_message(id: &str) -> TransportMessage {
    TransportMessage::encode(&create_raw_message(id))
}

/// One listing page
pub fn create_page(ids: &[&str], next_page_token: Option<&str>) -> SpamPage {
    SpamPage {
        matches: ids.iter().map(|id| SpamMatch::new(*id)).collect(),
        next_page_token: next_page_token.map(str::to_string),
    }
}

pub fn create_report_builder() -> ReportBuilder {
    ReportBuilder::new(OWNER, ABUSE_DESK)
}

pub fn create_sweep_config() -> SweepConfig {
    SweepConfig::default()
}

/// Decode a sent report back into text
pub fn decode_report(message: &TransportMessage) -> String {
    String::from_utf8(message.decode().expect("report is valid base64url"))
        .expect("report is ASCII")
}

mock! {
    pub GmailClient {}

    #[async_trait::async_trait]
    impl GmailClient for GmailClient {
        async fn list_spam(
            &self,
            query: &str,
            page_size: u32,
            page_token: Option<String>,
        ) -> Result<SpamPage>;
        async fn fetch_raw(&self, id: &str) -> Result<TransportMessage>;
        async fn send_raw(&self, message: &TransportMessage) -> Result<()>;
        async fn delete_message(&self, id: &str) -> Result<()>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_raw_message_uses_crlf() {
        let raw = String::from_utf8(create_raw_message("x1")).unwrap();
        assert!(raw.contains("Subject: You won x1\r\n"));
        assert!(raw.ends_with("\r\n"));
    }

    #[test]
    fn test_create_page() {
        let page = create_page(&["a", "b"], Some("next"));
        assert_eq!(page.matches.len(), 2);
        assert_eq!(page.next_cursor(), Some("next"));
    }
}
