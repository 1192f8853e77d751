use super::html::{attr_values, file_name_from_url, select_first_text};
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use url::Url;

const DOWNLOAD_MARKER: &str = "download.php?filename=";
const OWN_DOWNLOADER: &str = "nishmat.net/wp-content/themes/nishmat/classes/download.php";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://(?:www\.)?nishmat\.net/lesson/").unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "nishmat_example1",
        url: "https://nishmat.net/lesson/the-journey-to-emunah/",
        download_url: "https://nishmat.net/wp-content/themes/nishmat/classes/download.php?filename=http://www.nishmattorah.com/uploads/DafnaSeigleman-cr.mp3",
        title: "From Egypt to Yam Suf: The Journey to Emunah",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "nishmat_example2",
        url: "https://nishmat.net/lesson/16/",
        download_url: "https://nishmat.net/wp-content/themes/nishmat/classes/download.php?filename=lecture14.mp3",
        title: "Mishloach Manot and Seudat Purim",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "https://nishmat.net/lesson/nonexistent-lesson/",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

pub struct NishmatExtractor {
    client: HttpClient,
}

impl NishmatExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Links through the site's own download script win over any other
    /// `download.php` mp3 link.
    fn download_link(doc: &Html) -> Option<String> {
        let candidates: Vec<String> = attr_values(doc, "a[href]", "href")
            .into_iter()
            .filter(|href| {
                let href = href.to_lowercase();
                href.contains(DOWNLOAD_MARKER) && href.ends_with(".mp3")
            })
            .collect();

        candidates
            .iter()
            .find(|href| href.to_lowercase().contains(OWN_DOWNLOADER))
            .or_else(|| candidates.first())
            .cloned()
    }

    fn file_name(download_url: &str) -> String {
        let target = match download_url.find("filename=") {
            Some(i) => &download_url[i + "filename=".len()..],
            None => download_url,
        };
        file_name_from_url(target)
    }

    fn parse_page(body: &str, page_url: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(body);
        let href = Self::download_link(&doc)
            .ok_or_else(|| ExtractError::DownloadUrl("no download.php mp3 link".into()))?;
        let download_url = Url::parse(page_url)
            .and_then(|base| base.join(&href))
            .map_err(|e| ExtractError::DownloadUrl(format!("{}: {}", href, e)))?
            .to_string();
        let file_name = Self::file_name(&download_url);
        let title = select_first_text(&doc, &["div.PostTitle", "h1", "title"])
            .unwrap_or_else(|| file_name.clone());

        Ok(Extraction::new(download_url)
            .with_title(title)
            .with_file_format("audio/mp3")
            .with_file_name(file_name))
    }
}

#[async_trait]
impl Extractor for NishmatExtractor {
    fn name(&self) -> &'static str {
        "Nishmat"
    }

    fn homepage(&self) -> &'static str {
        "https://nishmat.net"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let body = self.client.get_text(url).await?;
        Self::parse_page(&body, url)
    }
}
