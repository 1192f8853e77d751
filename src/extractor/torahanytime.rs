use super::html::file_name_from_url;
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?torahanytime\.com/").unwrap());

static MYTAT_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://(?:www\.)?mytat\.me/").unwrap());

// The page embeds its data as an escaped JSON string, so quotes may or may
// not be preceded by a backslash.
static AUDIO_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""audio_url\\?":\\?"(https.*?)""#).unwrap());

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\\"title\\":\\"(.*?)\\""#).unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "lecture_page",
        url: "https://torahanytime.com/lectures/335042",
        download_url: "https://dl.torahanytime.com/mp3/335042--____10_04_2024__ee9743cb-5d09-4ffc-a3e3-1156e10e8944.mp4.mp3",
        title: "Aish Kodesh- Toldot, 5702, When It's Hard to Thank Hashem (2021/22 Series- Enhanced III)",
        file_format: "mp3",
        valid: true,
    },
];

pub struct TorahAnytimeExtractor {
    client: HttpClient,
}

impl TorahAnytimeExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn parse_page(body: &str) -> Result<Extraction, ExtractError> {
        let download_url = AUDIO_URL_REGEX
            .captures(body)
            .map(|caps| caps[1].replace('\\', ""))
            .ok_or_else(|| ExtractError::DownloadUrl("no audio_url in page data".into()))?;

        let file_name = file_name_from_url(&download_url);

        let title = TITLE_REGEX
            .captures(body)
            .map(|caps| caps[1].to_string())
            .unwrap_or_else(|| file_name.split('.').next().unwrap_or_default().to_string());

        if download_url.is_empty() || title.is_empty() {
            return Err(ExtractError::Content("page data is missing url or title".into()));
        }

        Ok(Extraction::new(download_url)
            .with_title(title)
            .with_file_format("mp3")
            .with_file_name(file_name))
    }
}

#[async_trait]
impl Extractor for TorahAnytimeExtractor {
    fn name(&self) -> &'static str {
        "TorahAnytime"
    }

    fn homepage(&self) -> &'static str {
        "https://torahanytime.com"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX, &*MYTAT_URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let body = self.client.get_text(url).await?;
        Self::parse_page(&body)
    }
}
