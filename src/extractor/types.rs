use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Extractor not found for URL: {0}")]
    NoExtractor(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Could not resolve download URL: {0}")]
    DownloadUrl(String),
    #[error("Could not resolve title: {0}")]
    Title(String),
    #[error("Content extraction failed: {0}")]
    Content(String),
}

/// Payload-free view of an [`ExtractError`], for callers that only care
/// which failure class they got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExtractorNotFound,
    NetworkFailure,
    DownloadUrlUnresolved,
    TitleUnresolved,
    ContentExtractionFailed,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::NoExtractor(_) => ErrorKind::ExtractorNotFound,
            ExtractError::Network(_) => ErrorKind::NetworkFailure,
            ExtractError::DownloadUrl(_) => ErrorKind::DownloadUrlUnresolved,
            ExtractError::Title(_) => ErrorKind::TitleUnresolved,
            ExtractError::Content(_) => ErrorKind::ContentExtractionFailed,
        }
    }
}

impl ErrorKind {
    /// Process exit status used by the CLI
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::ExtractorNotFound => 1,
            ErrorKind::NetworkFailure => 2,
            ErrorKind::DownloadUrlUnresolved => 3,
            ErrorKind::TitleUnresolved => 4,
            ErrorKind::ContentExtractionFailed => 5,
        }
    }
}

/// The resolved download link for a page, plus whatever metadata the site
/// exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Extraction {
    pub fn new(download_url: impl Into<String>) -> Self {
        Self {
            download_url: download_url.into(),
            title: None,
            file_format: None,
            file_name: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_file_format(mut self, file_format: impl Into<String>) -> Self {
        self.file_format = Some(file_format.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// A known page on a site together with what extracting it should yield.
/// Invalid examples are pages that must fail to extract.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionExample {
    pub name: &'static str,
    pub url: &'static str,
    pub download_url: &'static str,
    pub title: &'static str,
    pub file_format: &'static str,
    pub valid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub homepage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_have_distinct_exit_codes() {
        let kinds = [
            ErrorKind::ExtractorNotFound,
            ErrorKind::NetworkFailure,
            ErrorKind::DownloadUrlUnresolved,
            ErrorKind::TitleUnresolved,
            ErrorKind::ContentExtractionFailed,
        ];
        let mut codes: Vec<u8> = kinds.iter().map(|k| k.exit_code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|c| *c != 0));
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            ExtractError::NoExtractor("x".into()).kind(),
            ErrorKind::ExtractorNotFound
        );
        assert_eq!(
            ExtractError::DownloadUrl("x".into()).kind(),
            ErrorKind::DownloadUrlUnresolved
        );
        assert_eq!(ExtractError::Title("x".into()).kind(), ErrorKind::TitleUnresolved);
        assert_eq!(
            ExtractError::Content("x".into()).kind(),
            ErrorKind::ContentExtractionFailed
        );
    }

    #[test]
    fn test_absent_fields_are_not_serialized() {
        let extraction = Extraction::new("https://example.org/a.mp3").with_title("A");
        let json = serde_json::to_value(&extraction).unwrap();
        assert_eq!(json["download_url"], "https://example.org/a.mp3");
        assert_eq!(json["title"], "A");
        assert!(json.get("file_format").is_none());
        assert!(json.get("file_name").is_none());
    }
}
