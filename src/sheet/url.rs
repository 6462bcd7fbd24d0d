//! Spreadsheet identifier extraction from document URLs.

use crate::error::Result;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Errors related to spreadsheet URLs and identifier tokens.
#[derive(Error, Debug)]
pub enum UrlError {
    /// Not a docs.google.com spreadsheet URL, or the identifier segment is missing
    #[error("Invalid spreadsheet URL '{0}'")]
    InvalidUrl(String),

    /// Identifier is not a plain URL-safe token
    #[error("Invalid spreadsheet identifier '{0}'")]
    InvalidIdentifier(String),
}

/// Checks that an identifier is a plain URL-safe token.
pub(crate) fn is_identifier(value: &str) -> bool {
    let pattern = Regex::new(r"^[A-Za-z0-9_-]+$").expect("Hardcode regex pattern");
    pattern.is_match(value)
}

/// Checks whether a string looks like a document URL rather than a bare identifier.
pub(crate) fn is_document_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Extracts the spreadsheet identifier from a document URL.
///
/// The identifier is the path segment following `spreadsheets/d` on the
/// `docs.google.com` host; anything else is rejected.
pub(crate) fn extract_identifier(value: &str) -> Result<String> {
    let url = Url::parse(value).map_err(|_| UrlError::InvalidUrl(value.to_owned()))?;
    if url.host_str() != Some("docs.google.com") {
        return Err(UrlError::InvalidUrl(value.to_owned()).into());
    }
    let mut segments = url
        .path_segments()
        .ok_or_else(|| UrlError::InvalidUrl(value.to_owned()))?;
    if segments.next() != Some("spreadsheets") || segments.next() != Some("d") {
        return Err(UrlError::InvalidUrl(value.to_owned()).into());
    }
    match segments.next() {
        Some(id) if is_identifier(id) => Ok(id.to_owned()),
        _ => Err(UrlError::InvalidUrl(value.to_owned()).into()),
    }
}
