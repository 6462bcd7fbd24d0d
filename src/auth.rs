//! Credential resolution for the wrapped Google service clients.
//!
//! A caller hands either a path to a service account key file or an already
//! loaded key; both service clients (Sheets and BigQuery) are built from the
//! same [`CredentialSource`]. Token exchange, refresh and transport security
//! are handled entirely by the SDK crates.

use crate::error::Result;
use google_cloud_bigquery::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_bigquery::client::{Client, ClientConfig};
use google_sheets4::{hyper, hyper_rustls, oauth2, Sheets};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// OAuth scope requested on every Sheets call.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Authenticated Sheets service handle.
pub type SheetsHub = Sheets<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

/// Errors raised while turning a credential source into a service client.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Key file is missing, unreadable, or not a valid service account key
    #[error("Cannot read service account key '{path}': {source}")]
    KeyFileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Service account authenticator could not be constructed from the key
    #[error("Cannot build authenticator: {0}")]
    AuthenticatorError(std::io::Error),

    /// Key content was rejected by the BigQuery credential loader
    #[error("Invalid BigQuery credentials: {0}")]
    BigQueryCredentialsError(String),

    /// BigQuery client construction failed
    #[error("Cannot build BigQuery client: {0}")]
    BigQueryClientError(String),
}

/// A credential input: either a key file on disk or an already parsed key.
///
/// The prepared form is used as-is; scope correctness is the caller's
/// responsibility at that boundary.
pub enum CredentialSource {
    /// Path to a service account key file
    KeyFile(PathBuf),
    /// Already loaded service account key
    Prepared(oauth2::ServiceAccountKey),
}

impl From<&str> for CredentialSource {
    fn from(path: &str) -> Self {
        Self::KeyFile(PathBuf::from(path))
    }
}

impl From<String> for CredentialSource {
    fn from(path: String) -> Self {
        Self::KeyFile(PathBuf::from(path))
    }
}

impl From<&Path> for CredentialSource {
    fn from(path: &Path) -> Self {
        Self::KeyFile(path.to_path_buf())
    }
}

impl From<PathBuf> for CredentialSource {
    fn from(path: PathBuf) -> Self {
        Self::KeyFile(path)
    }
}

impl From<oauth2::ServiceAccountKey> for CredentialSource {
    fn from(key: oauth2::ServiceAccountKey) -> Self {
        Self::Prepared(key)
    }
}

impl CredentialSource {
    /// Produces the service account key, reading the key file when needed.
    async fn service_account_key(&self) -> Result<oauth2::ServiceAccountKey> {
        match self {
            Self::KeyFile(path) => {
                oauth2::read_service_account_key(path)
                    .await
                    .map_err(|source| {
                        AuthError::KeyFileError {
                            path: path.clone(),
                            source,
                        }
                        .into()
                    })
            }
            Self::Prepared(key) => Ok(key.clone()),
        }
    }
}

/// Builds an authenticated Sheets hub from a credential source.
pub(crate) async fn sheets_hub(source: &CredentialSource) -> Result<SheetsHub> {
    let key = source.service_account_key().await?;
    let auth = oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(AuthError::AuthenticatorError)?;
    let client = hyper::Client::builder().build(
        hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_only()
            .enable_http1()
            .build(),
    );
    Ok(Sheets::new(client, auth))
}

/// Builds an authenticated BigQuery client.
///
/// With no explicit source, credential discovery falls back to the standard
/// environment lookup (`GOOGLE_APPLICATION_CREDENTIALS` or metadata server)
/// performed by the SDK.
pub(crate) async fn bigquery_client(source: Option<&CredentialSource>) -> Result<Client> {
    let (config, _) = match source {
        Some(source) => {
            let credentials = match source {
                CredentialSource::KeyFile(path) => {
                    CredentialsFile::new_from_file(path.to_string_lossy().into_owned())
                        .await
                        .map_err(|e| AuthError::BigQueryCredentialsError(e.to_string()))?
                }
                CredentialSource::Prepared(key) => {
                    // The two SDK stacks use different key types; the JSON form
                    // is the common denominator.
                    let json = serde_json::to_string(key)?;
                    CredentialsFile::new_from_str(&json)
                        .await
                        .map_err(|e| AuthError::BigQueryCredentialsError(e.to_string()))?
                }
            };
            ClientConfig::new_with_credentials(credentials)
                .await
                .map_err(|e| AuthError::BigQueryClientError(e.to_string()))?
        }
        None => ClientConfig::new_with_auth()
            .await
            .map_err(|e| AuthError::BigQueryClientError(e.to_string()))?,
    };
    Client::new(config)
        .await
        .map_err(|e| AuthError::BigQueryClientError(e.to_string()))
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_from_path_like_inputs() {
        assert!(matches!(
            CredentialSource::from("key.json"),
            CredentialSource::KeyFile(_)
        ));
        assert!(matches!(
            CredentialSource::from(String::from("key.json")),
            CredentialSource::KeyFile(_)
        ));
        assert!(matches!(
            CredentialSource::from(PathBuf::from("key.json")),
            CredentialSource::KeyFile(_)
        ));
        assert!(matches!(
            CredentialSource::from(Path::new("key.json")),
            CredentialSource::KeyFile(_)
        ));
    }

    #[test]
    fn key_file_path_is_kept() {
        let source = CredentialSource::from("/etc/keys/sa.json");
        match source {
            CredentialSource::KeyFile(path) => {
                assert_eq!(path, PathBuf::from("/etc/keys/sa.json"))
            }
            CredentialSource::Prepared(_) => panic!("expected a key file source"),
        }
    }

    #[tokio::test]
    async fn missing_key_file_is_a_credential_error() {
        let source = CredentialSource::from("does-not-exist.json");
        let result = sheets_hub(&source).await;
        assert!(matches!(
            result,
            Err(crate::error::SheetLiftError::AuthError(
                AuthError::KeyFileError { .. }
            ))
        ));
    }

    // Needs real credentials; run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore = "requires GOOGLE_APPLICATION_CREDENTIALS"]
    async fn resolves_hub_from_key_file() {
        let path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
            .expect("GOOGLE_APPLICATION_CREDENTIALS");
        let source = CredentialSource::from(path);
        assert!(sheets_hub(&source).await.is_ok());
    }

    #[tokio::test]
    #[ignore = "requires GOOGLE_APPLICATION_CREDENTIALS"]
    async fn resolves_hub_from_prepared_key() {
        let path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
            .expect("GOOGLE_APPLICATION_CREDENTIALS");
        let key = oauth2::read_service_account_key(&path)
            .await
            .expect("readable key file");
        let source = CredentialSource::from(key);
        assert!(sheets_hub(&source).await.is_ok());
    }
}
