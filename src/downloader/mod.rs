mod simple;

pub use simple::SimpleDownloader;

use crate::http::HttpClient;
use reqwest::StatusCode;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: {0}")]
    Status(StatusCode),
    #[error("Write error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetch `url` into `output_path`, returning the number of bytes written.
pub async fn download(
    client: &HttpClient,
    url: &str,
    output_path: &Path,
) -> Result<u64, DownloadError> {
    SimpleDownloader::new(client).download(url, output_path).await
}
