use super::html::{attr_values, collapse_whitespace};
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use url::form_urlencoded;

const DOWNLOAD_BASE: &str = "http://download.mp3shiur.com";
const DOWNLOAD_MARKER: &str = "download.asp?fn=";

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?mp3shiur\.com/prodDetails\.asp").unwrap()
});

static FN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"fn=([^&]+)").unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "mp3shiur_example",
        url: "http://www.mp3shiur.com/prodDetails.asp?catID=437&prodID=5042",
        download_url: "http://download.mp3shiur.com/Kesubos 002  2A L4.mp3",
        title: "Kesubos 002 2A L4",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "mp3shiur_example2",
        url: "http://www.mp3shiur.com/prodDetails.asp?catID=391&prodID=3557",
        download_url: "http://download.mp3shiur.com/03 Mishmar Kedushin 3A Kinyun Moel.mp3",
        title: "03 Mishmar Kedushin 3A Kinyun Moel",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "http://www.mp3shiur.com/prodDetails.asp?catID=437&prodID=0000",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

pub struct Mp3ShiurExtractor {
    client: HttpClient,
}

impl Mp3ShiurExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// The `fn` parameter of the page's download link, as the site's
    /// download host expects it.
    fn file_name(doc: &Html) -> Result<String, ExtractError> {
        let href = attr_values(doc, "a[href]", "href")
            .into_iter()
            .find(|href| href.to_lowercase().contains(DOWNLOAD_MARKER))
            .ok_or_else(|| ExtractError::DownloadUrl("no download.asp link on page".into()))?;

        let from_query = href.split_once('?').and_then(|(_, query)| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(k, v)| k == "fn" && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        });
        if let Some(name) = from_query {
            return Ok(name);
        }

        FN_REGEX
            .captures(&href)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ExtractError::DownloadUrl(format!("no file name in {}", href)))
    }

    fn normalize(s: &str) -> String {
        collapse_whitespace(&s.replace(".mp3", ""))
    }

    /// Prefer a bold caption that agrees with the file name; the file name
    /// itself is the fallback.
    fn title(doc: &Html, file_name: &str) -> String {
        let normalized_file = Self::normalize(file_name);
        let Ok(bold) = Selector::parse("b") else {
            return normalized_file;
        };

        doc.select(&bold)
            .map(|b| b.text().collect::<String>().trim().to_string())
            .find(|text| {
                if text.is_empty() || text.contains(".mp3") || text.chars().count() <= 5 {
                    return false;
                }
                let normalized = Self::normalize(text);
                normalized_file.contains(&normalized) || normalized.contains(&normalized_file)
            })
            .unwrap_or(normalized_file)
    }

    fn parse_page(body: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(body);
        let file_name = Self::file_name(&doc)?;
        let title = Self::title(&doc, &file_name);

        Ok(Extraction::new(format!("{}/{}", DOWNLOAD_BASE, file_name))
            .with_title(title)
            .with_file_format("audio/mp3")
            .with_file_name(file_name))
    }
}

#[async_trait]
impl Extractor for Mp3ShiurExtractor {
    fn name(&self) -> &'static str {
        "MP3Shiur"
    }

    fn homepage(&self) -> &'static str {
        "http://www.mp3shiur.com"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let body = self.client.get_text(url).await?;
        Self::parse_page(&body)
    }
}
