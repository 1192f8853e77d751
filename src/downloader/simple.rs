use super::DownloadError;
use crate::http::HttpClient;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub struct SimpleDownloader {
    client: Client,
}

impl SimpleDownloader {
    pub fn new(client: &HttpClient) -> Self {
        Self {
            client: client.inner().clone(),
        }
    }

    pub async fn download(&self, url: &str, output_path: &Path) -> Result<u64, DownloadError> {
        // Ensure parent directory exists
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status()));
        }

        let total = response.content_length();
        info!("Downloading {} to {}", url, output_path.display());

        let mut file = File::create(output_path).await?;
        match Self::write_body(response, &mut file, total).await {
            Ok(downloaded) => {
                file.flush().await?;
                info!("Wrote {} bytes to {}", downloaded, output_path.display());
                Ok(downloaded)
            }
            Err(e) => {
                // Don't leave a truncated file behind
                drop(file);
                let _ = tokio::fs::remove_file(output_path).await;
                Err(e)
            }
        }
    }

    async fn write_body(
        response: reqwest::Response,
        file: &mut File,
        total: Option<u64>,
    ) -> Result<u64, DownloadError> {
        let mut downloaded: u64 = 0;
        let mut last_report = Instant::now();
        let mut last_downloaded: u64 = 0;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            downloaded += chunk.len() as u64;
            file.write_all(&chunk).await?;

            // Report progress every 100ms
            if last_report.elapsed().as_millis() >= 100 {
                let elapsed = last_report.elapsed().as_secs_f64();
                let speed = if elapsed > 0.0 {
                    ((downloaded - last_downloaded) as f64 / elapsed) as u64
                } else {
                    0
                };
                let percent = total
                    .map(|t| (downloaded as f64 / t as f64) * 100.0)
                    .unwrap_or(0.0);
                debug!(downloaded, ?total, speed, "download progress {:.1}%", percent);

                last_report = Instant::now();
                last_downloaded = downloaded;
            }
        }

        Ok(downloaded)
    }
}
