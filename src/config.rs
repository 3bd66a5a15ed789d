use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GmailError, Result};
use crate::report::{AttachmentEncoding, ReportBuilder};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

/// Where reports go and what they look like
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_destination")]
    pub destination: String,
    /// From header value; empty means "use the authenticated account"
    #[serde(default)]
    pub owner_address: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_note")]
    pub note: String,
    #[serde(default = "default_attachment_name")]
    pub attachment_name: String,
    #[serde(default)]
    pub attachment_encoding: AttachmentEncoding,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            owner_address: String::new(),
            subject: default_subject(),
            note: default_note(),
            attachment_name: default_attachment_name(),
            attachment_encoding: AttachmentEncoding::default(),
        }
    }
}

impl ReportConfig {
    /// Report builder sending from `owner_address`
    pub fn builder(&self, owner_address: &str) -> ReportBuilder {
        ReportBuilder::new(owner_address, self.destination.clone())
            .subject(self.subject.clone())
            .note(self.note.clone())
            .attachment_name(self.attachment_name.clone())
            .encoding(self.attachment_encoding)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_concurrent_messages")]
    pub max_concurrent_messages: usize,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            page_size: default_page_size(),
            max_concurrent_messages: default_max_concurrent_messages(),
            max_concurrent_requests: default_max_concurrent_requests(),
            dry_run: false,
        }
    }
}

fn default_destination() -> String {
    "lala@spam.spamcop.net".to_string()
}

fn default_subject() -> String {
    "Spam report".to_string()
}

fn default_note() -> String {
    "Spam report".to_string()
}

fn default_attachment_name() -> String {
    "email.txt".to_string()
}

fn default_query() -> String {
    "in:spam".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_max_concurrent_messages() -> usize {
    1
}

fn default_max_concurrent_requests() -> usize {
    10
}

fn validate_address(field: &str, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GmailError::ConfigError(format!("{} cannot be empty", field)));
    }
    if !value.contains('@') || value.contains(&['\r', '\n'][..]) {
        return Err(GmailError::ConfigError(format!(
            "{} is not a valid email address: '{}'",
            field, value
        )));
    }
    Ok(())
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GmailError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GmailError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GmailError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GmailError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_address("report.destination", &self.report.destination)?;

        // Owner may be left empty and resolved from the account profile
        if !self.report.owner_address.trim().is_empty() {
            validate_address("report.owner_address", &self.report.owner_address)?;
        }

        if self.report.subject.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "report.subject cannot be empty".to_string(),
            ));
        }
        if self.report.subject.contains(&['\r', '\n'][..]) {
            return Err(GmailError::ConfigError(
                "report.subject must be a single line".to_string(),
            ));
        }
        // The note part is declared 7bit
        if !self.report.note.is_ascii() {
            return Err(GmailError::ConfigError(
                "report.note must be plain ASCII".to_string(),
            ));
        }
        if self.report.attachment_name.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "report.attachment_name cannot be empty".to_string(),
            ));
        }
        if self.report.attachment_name.contains(&['"', '\r', '\n'][..]) {
            return Err(GmailError::ConfigError(
                "report.attachment_name cannot contain quotes or line breaks".to_string(),
            ));
        }

        if self.sweep.query.trim().is_empty() {
            return Err(GmailError::ConfigError(
                "sweep.query cannot be empty".to_string(),
            ));
        }

        // Gmail caps messages.list at 500 results per page
        if self.sweep.page_size == 0 || self.sweep.page_size > 500 {
            return Err(GmailError::ConfigError(
                "sweep.page_size must be between 1 and 500".to_string(),
            ));
        }

        if self.sweep.max_concurrent_messages == 0 {
            return Err(GmailError::ConfigError(
                "sweep.max_concurrent_messages must be at least 1".to_string(),
            ));
        }
        if self.sweep.max_concurrent_messages > 50 {
            return Err(GmailError::ConfigError(
                "sweep.max_concurrent_messages cannot exceed 50".to_string(),
            ));
        }

        if self.sweep.max_concurrent_requests == 0 {
            return Err(GmailError::ConfigError(
                "sweep.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.sweep.max_concurrent_requests > 50 {
            return Err(GmailError::ConfigError(
                "sweep.max_concurrent_requests cannot exceed 50 (to stay under Gmail API rate limits of 250 units/sec)".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    ///
    /// The owner address is left empty so the authenticated account is used.
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}
