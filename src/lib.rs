//! Resolve Torah lecture pages into direct media download links.
//!
//! ```no_run
//! # async fn run() -> Result<(), torah_dl::ExtractError> {
//! let extraction = torah_dl::extract(
//!     "https://www.yutorah.org/lectures/1116616/Praying-for-Rain-and-the-International-Traveler",
//! )
//! .await?;
//! println!("{}", extraction.download_url);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod downloader;
pub mod extractor;
pub mod http;

pub use downloader::{download, DownloadError};
pub use extractor::{
    default_registry, extract, ErrorKind, ExtractError, Extraction, ExtractionExample, Extractor,
    Registry, Site,
};
pub use http::HttpClient;
