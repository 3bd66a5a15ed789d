use thiserror::Error;

/// Type alias for Result with GmailError
pub type Result<T> = std::result::Result<T, GmailError>;

/// Error types for the spam reporter
#[derive(Error, Debug)]
pub enum GmailError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Invalid message format or missing fields in an API response
    #[error("Invalid message format: {0}")]
    InvalidMessageFormat(String),

    /// Transport payload was not valid URL-safe base64
    #[error("Failed to decode message {id}: {reason}")]
    DecodeError { id: String, reason: String },

    /// The report for a message was not accepted by the send call
    #[error("Failed to send report for message {id}: {reason}")]
    SendFailed { id: String, reason: String },

    /// The original message could not be deleted after its report was sent
    #[error("Failed to delete message {id} after sending its report: {reason}")]
    DeleteFailed { id: String, reason: String },

    /// Unknown alphabet name for token generation
    #[error("Invalid alphabet: {0}")]
    InvalidAlphabet(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl GmailError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GmailError::RateLimitExceeded { .. }
                | GmailError::ServerError { .. }
                | GmailError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// The Retry-After header can be specified in two formats:
/// 1. Delay-seconds: An integer indicating seconds to wait (e.g., "120")
/// 2. HTTP-date: An HTTP date format (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
///
/// Returns the number of seconds to wait. If the header is missing or invalid,
/// returns a default of 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    let Some(value) = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
    else {
        return DEFAULT_RETRY_AFTER;
    };

    if let Ok(seconds) = value.parse::<u64>() {
        return seconds;
    }

    httpdate::parse_http_date(value)
        .ok()
        .and_then(|at| at.duration_since(std::time::SystemTime::now()).ok())
        .map(|d| d.as_secs())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl From<google_gmail1::Error> for GmailError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => GmailError::RateLimitExceeded {
                        retry_after: parse_retry_after_header(response),
                    },
                    404 => GmailError::MessageNotFound("Resource not found".to_string()),
                    400 => GmailError::BadRequest(message),
                    401 => GmailError::AuthError(message),
                    403 => GmailError::Forbidden(message),
                    500..=599 => GmailError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => GmailError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => GmailError::BadRequest(format!("{}", err)),
            google_gmail1::Error::HttpError(ref err) => {
                GmailError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GmailError::NetworkError(err.to_string()),
            _ => GmailError::ApiError(error.to_string()),
        }
    }
}
