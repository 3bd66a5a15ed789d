//! Spam report construction
//!
//! A report is a `multipart/mixed` message with two parts: a short plain-text
//! note and the original spam message attached as `message/rfc822`. The
//! caller supplies the boundary; it must not occur as a line prefix in either
//! part, which [`crate::token::boundary`] makes overwhelmingly unlikely.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GmailError;

/// Column width for base64 attachment bodies (RFC 2045)
const BASE64_LINE_WIDTH: usize = 76;

/// How the attached original message is written into the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentEncoding {
    /// Base64 encode the attachment so the declared transfer encoding holds
    #[default]
    Base64,
    /// Embed the decoded bytes as-is under a `base64` transfer-encoding
    /// header, matching the legacy report layout byte for byte
    Verbatim,
}

impl FromStr for AttachmentEncoding {
    type Err = GmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base64" => Ok(AttachmentEncoding::Base64),
            "verbatim" => Ok(AttachmentEncoding::Verbatim),
            other => Err(GmailError::ConfigError(format!(
                "Invalid attachment encoding: '{}'. Must be 'base64' or 'verbatim'",
                other
            ))),
        }
    }
}

impl fmt::Display for AttachmentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentEncoding::Base64 => f.write_str("base64"),
            AttachmentEncoding::Verbatim => f.write_str("verbatim"),
        }
    }
}

/// Builds spam reports for one destination
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub note: String,
    pub attachment_name: String,
    pub encoding: AttachmentEncoding,
}

impl ReportBuilder {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: "Spam report".to_string(),
            note: "Spam report".to_string(),
            attachment_name: "email.txt".to_string(),
            encoding: AttachmentEncoding::default(),
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn attachment_name(mut self, name: impl Into<String>) -> Self {
        self.attachment_name = name.into();
        self
    }

    pub fn encoding(mut self, encoding: AttachmentEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Build the report for `raw_message` using `boundary`
    pub fn build(&self, raw_message: &[u8], boundary: &str) -> Vec<u8> {
        match self.encoding {
            AttachmentEncoding::Base64 => self.build_base64(raw_message, boundary),
            AttachmentEncoding::Verbatim => self.build_verbatim(raw_message, boundary),
        }
    }

    fn build_base64(&self, raw_message: &[u8], boundary: &str) -> Vec<u8> {
        let mut out = String::with_capacity(raw_message.len() * 4 / 3 + 1024);

        out.push_str(&format!("Content-Type: multipart/mixed; boundary={}\n", boundary));
        out.push_str("MIME-Version: 1.0\n");
        out.push_str(&format!("To: {}\n", self.to));
        out.push_str(&format!("From: {}\n", self.from));
        out.push_str(&format!("Subject: {}\n\n", self.subject));

        out.push_str(&format!("--{}\n", boundary));
        out.push_str("Content-Type: text/plain; charset=\"UTF-8\"\n");
        out.push_str("MIME-Version: 1.0\n");
        out.push_str("Content-Transfer-Encoding: 7bit\n\n");
        out.push_str(&self.note);
        out.push_str("\n\n");

        out.push_str(&format!("--{}\n", boundary));
        out.push_str(&format!(
            "Content-Type: message/rfc822; name=\"{}\"\n",
            self.attachment_name
        ));
        out.push_str("MIME-Version: 1.0\n");
        out.push_str("Content-Transfer-Encoding: base64\n");
        out.push_str(&format!(
            "Content-Disposition: attachment; filename=\"{}\"\n\n",
            self.attachment_name
        ));

        let encoded = STANDARD.encode(raw_message);
        for line in encoded.as_bytes().chunks(BASE64_LINE_WIDTH) {
            // base64 output is ASCII
            out.push_str(std::str::from_utf8(line).unwrap_or_default());
            out.push('\n');
        }

        out.push_str(&format!("--{}--\n", boundary));
        out.into_bytes()
    }

    fn build_verbatim(&self, raw_message: &[u8], boundary: &str) -> Vec<u8> {
        let head = format!(
            "Content-Type: multipart/mixed; boundary={b} \n\
             MIME-Version: 1.0\n\
             To: {to}\n\
             From: {from}\n\
             Subject: {subject}\n\n\
             --{b}\n\
             Content-Type: text/plain; charset=\"UTF-8\"\n\
             MIME-Version: 1.0\n\
             Content-Transfer-Encoding: 7bit\n\n\
             {note}\n\n\
             --{b}\n\
             Content-Type: message/rfc822; name=\"{name}\" \n\
             MIME-Version: 1.0\n\
             Content-Transfer-Encoding: base64\n\
             Content-Disposition: attachment; filename=\"{name}\" \n\n",
            b = boundary,
            to = self.to,
            from = self.from,
            subject = self.subject,
            note = self.note,
            name = self.attachment_name,
        );

        let mut out = Vec::with_capacity(head.len() + raw_message.len() + boundary.len() + 4);
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(raw_message);
        out.extend_from_slice(format!("--{}--", boundary).as_bytes());
        out
    }
}
