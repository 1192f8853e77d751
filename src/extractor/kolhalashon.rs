use super::id3;
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

const MEDIA_BASE: &str = "https://www.kolhalashon.com/mp3/NewArchive";

// Enough of the file to cover the ID3 tag of every recording seen so far.
const ID3_PROBE_LEN: u64 = 128 * 1024;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?kolhalashon\.com/").unwrap());

static FILE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6,8}$").unwrap());

static PLAY_SHIUR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/playShiur/([0-9]{1,8})(?:/|$)").unwrap());

static DIGITS_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "play_shiur_url",
        url: "https://www.kolhalashon.com/new/Media/PlayShiur.aspx?FileName=34412186&English=True&Lang=English",
        download_url: "https://www.kolhalashon.com/mp3/NewArchive/34412/34412186.mp3",
        title: "Q&A w Rabbi Yaron Reuven The Foundation Of Good",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_file_id",
        url: "https://www.kolhalashon.com/new/Media/PlayShiur.aspx?FileName=00000000&English=True&Lang=English",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

/// Kol Halashon serves every recording from a path derived from its
/// numeric file id, so the page itself is never fetched.
pub struct KolHalashonExtractor {
    client: HttpClient,
    media_base: String,
}

impl KolHalashonExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            media_base: MEDIA_BASE.to_string(),
        }
    }

    pub fn with_media_base(mut self, base: impl Into<String>) -> Self {
        self.media_base = base.into();
        self
    }

    fn file_id(url: &str) -> Option<String> {
        let from_query = Url::parse(url).ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "FileName")
                .map(|(_, v)| v.trim().to_string())
        });
        if let Some(id) = from_query.filter(|id| FILE_NAME_REGEX.is_match(id)) {
            return Some(id);
        }

        if let Some(caps) = PLAY_SHIUR_REGEX.captures(url) {
            return Some(caps[1].to_string());
        }

        // Any standalone run of 6 to 8 digits.
        DIGITS_REGEX
            .find_iter(url)
            .map(|m| m.as_str())
            .find(|run| (6..=8).contains(&run.len()))
            .map(|run| run.to_string())
    }

    fn media_url(&self, padded_id: &str) -> Result<String, ExtractError> {
        let folder = padded_id
            .get(..5)
            .filter(|folder| folder.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ExtractError::DownloadUrl(format!("malformed file id {}", padded_id)))?;
        Ok(format!("{}/{}/{}.mp3", self.media_base, folder, padded_id))
    }

    async fn id3_title(&self, media_url: &str) -> Option<String> {
        match self.client.get_range(media_url, ID3_PROBE_LEN).await {
            Ok(data) => id3::read_title(&data),
            Err(e) => {
                debug!("Could not read ID3 tag from {}: {}", media_url, e);
                None
            }
        }
    }
}

#[async_trait]
impl Extractor for KolHalashonExtractor {
    fn name(&self) -> &'static str {
        "Kol Halashon"
    }

    fn homepage(&self) -> &'static str {
        "https://www.kolhalashon.com"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let file_id = Self::file_id(url)
            .ok_or_else(|| ExtractError::DownloadUrl(format!("no file id in {}", url)))?;
        let padded_id = format!("{:0>8}", file_id);
        let media_url = self.media_url(&padded_id)?;

        let head = self.client.head(&media_url).await?;
        if !head.status.is_success() {
            return Err(ExtractError::DownloadUrl(format!(
                "{} returned {}",
                media_url, head.status
            )));
        }
        if !head.is_audio() {
            return Err(ExtractError::DownloadUrl(format!(
                "{} is not audio ({})",
                media_url,
                head.content_type.as_deref().unwrap_or("no content type")
            )));
        }

        let title = match self.id3_title(&media_url).await {
            Some(title) => title,
            None => format!("Shiur {}", padded_id),
        };

        Ok(Extraction::new(media_url)
            .with_title(title)
            .with_file_format("audio/mp3")
            .with_file_name(format!("{}.mp3", padded_id)))
    }
}
