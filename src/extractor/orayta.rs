use super::types::*;
use super::yutorah::YutorahExtractor;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use reqwest::StatusCode;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

const YUTORAH_BASE: &str = "https://www.yutorah.org";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?orayta\.org/").unwrap());

static DOWNLOAD_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""downloadURL":"(https?://[^"]+\.mp3)""#).unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "main_page_2025",
        url: "https://www.orayta.org/orayta-torah/audio-shiurim.html?page=lecture&shiurID=1135538&teacherFullName=Rabbi-Binny-Freedman&shiurTitle=Parashat-Emor-the-Blasphemer",
        download_url: "https://download.yutorah.org/2025/79131/1135538/parashat-emor-the-blasphemer.mp3",
        title: "Parashat Emor: the Blasphemer",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "main_page_2018",
        url: "https://www.orayta.org/orayta-torah/audio-shiurim.html?page=lecture&shiurID=909367&teacherFullName=Rabbi-Yitzchak-Blau&shiurTitle=Reuven-Yehudah-and-the-Quest-for-Leadership",
        download_url: "https://download.yutorah.org/2018/30423/909367/reuven-yehudah-and-the-quest-for-leadership.mp3",
        title: "Reuven, Yehudah, and the Quest for Leadership",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "https://www.orayta.org/orayta-torah/audio-shiurim.html?page=lecture&shiurID=0000000&teacherFullName=Test&shiurTitle=Test",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

/// Orayta republishes YUTorah shiurim, so extraction is delegated to
/// YUTorah with a scrape of the modern YUTorah page as a fallback.
pub struct OraytaExtractor {
    client: HttpClient,
    yutorah: YutorahExtractor,
    yutorah_base: String,
}

struct ShiurInfo {
    id: String,
    title: String,
}

impl ShiurInfo {
    fn slug(&self) -> String {
        self.title.to_lowercase().replace(' ', "-")
    }
}

impl OraytaExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self {
            yutorah: YutorahExtractor::new(client.clone()),
            client,
            yutorah_base: YUTORAH_BASE.to_string(),
        }
    }

    pub fn with_yutorah(mut self, yutorah: YutorahExtractor) -> Self {
        self.yutorah = yutorah;
        self
    }

    pub fn with_yutorah_base(mut self, base: impl Into<String>) -> Self {
        self.yutorah_base = base.into();
        self
    }

    fn shiur_info(url: &str) -> Result<ShiurInfo, ExtractError> {
        let parsed =
            Url::parse(url).map_err(|e| ExtractError::Content(format!("{}: {}", url, e)))?;

        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, v)| k == name && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        };

        match (param("shiurID"), param("shiurTitle")) {
            (Some(id), Some(title)) => Ok(ShiurInfo { id, title }),
            _ => Err(ExtractError::Content(format!(
                "shiurID and shiurTitle are required: {}",
                url
            ))),
        }
    }

    fn yutorah_url(&self, shiur: &ShiurInfo) -> String {
        format!("{}/lectures/{}/{}", self.yutorah_base, shiur.id, shiur.slug())
    }

    /// Scrape the modern YUTorah page for its embedded download link and
    /// confirm it exists.
    async fn extract_from_yutorah_page(&self, shiur: &ShiurInfo) -> Result<Extraction, ExtractError> {
        let page_url = self.yutorah_url(shiur);
        let body = match self.client.try_get_text(&page_url).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                return Err(ExtractError::DownloadUrl(format!("{} is unavailable", page_url)))
            }
            Err(e) => return Err(ExtractError::DownloadUrl(e.to_string())),
        };

        let download_url = DOWNLOAD_URL_REGEX
            .captures(&body)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ExtractError::DownloadUrl(format!("no downloadURL on {}", page_url)))?;

        match self.client.head(&download_url).await {
            Ok(head) if head.status == StatusCode::OK => {}
            Ok(head) => {
                return Err(ExtractError::DownloadUrl(format!(
                    "{} returned {}",
                    download_url, head.status
                )))
            }
            Err(e) => return Err(ExtractError::DownloadUrl(e.to_string())),
        }

        Ok(Extraction::new(download_url)
            .with_title(shiur.title.clone())
            .with_file_format("audio/mp3")
            .with_file_name(format!("{}.mp3", shiur.slug())))
    }
}

#[async_trait]
impl Extractor for OraytaExtractor {
    fn name(&self) -> &'static str {
        "Orayta"
    }

    fn homepage(&self) -> &'static str {
        "https://orayta.org"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let shiur = Self::shiur_info(url)?;
        let yutorah_url = self.yutorah_url(&shiur);
        debug!("Orayta shiur {} -> {}", shiur.id, yutorah_url);

        match self.yutorah.extract(&yutorah_url).await {
            Ok(extraction) => Ok(extraction),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::DownloadUrlUnresolved
                        | ErrorKind::TitleUnresolved
                        | ErrorKind::NetworkFailure
                ) =>
            {
                warn!("YUTorah lookup for shiur {} failed ({}), trying the YUTorah page", shiur.id, e);
                self.extract_from_yutorah_page(&shiur).await
            }
            Err(e) => Err(e),
        }
    }
}
