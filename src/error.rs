use thiserror::Error;

/// Main error type for the sheetlift crate.
/// Aggregates errors from the standard library, the wrapped Google SDK clients,
/// and the internal builder modules.
#[derive(Error, Debug)]
pub enum SheetLiftError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Wrapped SDK errors
    #[error("{0}")]
    SheetsApiError(#[from] google_sheets4::Error),

    #[error("{0}")]
    BigQueryApiError(#[from] google_cloud_bigquery::http::error::Error),

    // Credential resolution errors
    #[error("{0}")]
    AuthError(#[from] crate::auth::AuthError),

    // Sheet builder errors
    #[error("{0}")]
    SheetError(#[from] crate::sheet::SheetError),

    #[error("{0}")]
    UrlError(#[from] crate::sheet::url::UrlError),

    #[error("{0}")]
    RangeError(#[from] crate::sheet::range::RangeError),

    // BigQuery builder errors
    #[error("{0}")]
    BqError(#[from] crate::bq::BqError),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SheetLiftError>;

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetLiftError::WithContextError(format!("{}: {}", message, e)))
    }
}
