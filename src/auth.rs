//! OAuth2 bootstrap for the Gmail API
//!
//! Produces the authenticated hub the sweep runs against. Token refresh and
//! persistence are handled by `yup-oauth2`.

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::env;
use std::path::Path;
use yup_oauth2::ApplicationSecret;

use crate::error::{GmailError, Result};

/// Full mailbox scope
///
/// `users.messages.delete` removes messages permanently and is only allowed
/// under this scope; it also covers listing, reading and sending. Every call
/// requests the same scope so the cached token is reused.
pub const MAIL_SCOPE: &str = "https://mail.google.com/";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Resolve the OAuth2 application secret
///
/// Reads `credentials_path` when it exists, otherwise falls back to the
/// `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET` environment variables.
pub async fn resolve_application_secret(credentials_path: &Path) -> Result<ApplicationSecret> {
    if credentials_path.exists() {
        return yup_oauth2::read_application_secret(credentials_path)
            .await
            .map_err(|e| GmailError::AuthError(format!("Failed to read credentials: {}", e)));
    }

    tracing::debug!(
        "Credentials file {:?} not found, trying environment",
        credentials_path
    );
    load_credentials_from_env().map_err(|e| {
        GmailError::AuthError(format!(
            "No credentials file at {:?} and environment is incomplete ({})",
            credentials_path, e
        ))
    })
}

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Sets up:
/// - OAuth2 authentication using InstalledFlow (desktop app flow)
/// - Token persistence to disk for automatic refresh
/// - HTTP/1 client with TLS support
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    let secret = resolve_application_secret(credentials_path).await?;

    if let Some(parent) = token_cache_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    // HTTPRedirect opens a browser for user authorization
    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| GmailError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Acquire once up front so the consent flow happens before the sweep starts
    let _token = auth
        .token(&[MAIL_SCOPE])
        .await
        .map_err(|e| GmailError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| GmailError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Load OAuth2 credentials from environment variables
///
/// # Environment Variables
/// - `GMAIL_CLIENT_ID`: OAuth2 client ID
/// - `GMAIL_CLIENT_SECRET`: OAuth2 client secret
/// - `GMAIL_REDIRECT_URI`: Redirect URI (optional, defaults to http://localhost:8080)
pub fn load_credentials_from_env() -> Result<ApplicationSecret> {
    let client_id = env::var("GMAIL_CLIENT_ID")
        .map_err(|_| GmailError::ConfigError("GMAIL_CLIENT_ID not set".to_string()))?;
    let client_secret = env::var("GMAIL_CLIENT_SECRET")
        .map_err(|_| GmailError::ConfigError("GMAIL_CLIENT_SECRET not set".to_string()))?;
    let redirect_uri =
        env::var("GMAIL_REDIRECT_URI").unwrap_or_else(|_| "http://localhost:8080".to_string());

    Ok(ApplicationSecret {
        client_id,
        client_secret,
        auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        redirect_uris: vec![redirect_uri],
        ..Default::default()
    })
}

/// Restrict the token cache to the owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows relies on the profile directory ACLs
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    const CREDENTIALS_JSON: &str = r#"{
        "installed": {
            "client_id": "test-client-id",
            "project_id": "test-project",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_secret": "test-secret",
            "redirect_uris": ["http://localhost:8080"]
        }
    }"#;

    #[tokio::test]
    #[serial]
    async fn test_resolve_secret_from_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), CREDENTIALS_JSON)
            .await
            .unwrap();

        let secret = resolve_application_secret(temp_file.path()).await.unwrap();
        assert_eq!(secret.client_id, "test-client-id");
        assert_eq!(secret.client_secret, "test-secret");
    }

    #[tokio::test]
    #[serial]
    async fn test_resolve_secret_from_env_when_file_missing() {
        env::set_var("GMAIL_CLIENT_ID", "env-id");
        env::set_var("GMAIL_CLIENT_SECRET", "env-secret");

        let secret = resolve_application_secret(Path::new("/nonexistent/credentials.json"))
            .await
            .unwrap();
        assert_eq!(secret.client_id, "env-id");

        env::remove_var("GMAIL_CLIENT_ID");
        env::remove_var("GMAIL_CLIENT_SECRET");
    }

    #[tokio::test]
    #[serial]
    async fn test_resolve_secret_fails_without_any_source() {
        env::remove_var("GMAIL_CLIENT_ID");
        env::remove_var("GMAIL_CLIENT_SECRET");

        let err = resolve_application_secret(Path::new("/nonexistent/credentials.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, GmailError::AuthError(_)));
        assert!(err.to_string().contains("GMAIL_CLIENT_ID"));
    }

    #[tokio::test]
    async fn test_secure_token_file() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "{}").await.unwrap();

        secure_token_file(temp_file.path()).await.unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = tokio::fs::metadata(temp_file.path()).await.unwrap();
            assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        }
    }

    #[test]
    #[serial]
    fn test_load_credentials_from_env() {
        env::set_var("GMAIL_CLIENT_ID", "test-id");
        env::set_var("GMAIL_CLIENT_SECRET", "test-secret");
        env::set_var("GMAIL_REDIRECT_URI", "http://localhost:9999");

        let secret = load_credentials_from_env().unwrap();
        assert_eq!(secret.client_id, "test-id");
        assert_eq!(secret.client_secret, "test-secret");
        assert_eq!(secret.redirect_uris[0], "http://localhost:9999");

        env::remove_var("GMAIL_CLIENT_ID");
        env::remove_var("GMAIL_CLIENT_SECRET");
        env::remove_var("GMAIL_REDIRECT_URI");
    }

    #[test]
    #[serial]
    fn test_load_credentials_from_env_default_redirect() {
        env::set_var("GMAIL_CLIENT_ID", "test-id");
        env::set_var("GMAIL_CLIENT_SECRET", "test-secret");
        env::remove_var("GMAIL_REDIRECT_URI");

        let secret = load_credentials_from_env().unwrap();
        assert_eq!(secret.redirect_uris[0], "http://localhost:8080");

        env::remove_var("GMAIL_CLIENT_ID");
        env::remove_var("GMAIL_CLIENT_SECRET");
    }
}
