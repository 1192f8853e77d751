use super::html::{file_name_from_url, select_text};
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

const CLASSIC_BASE: &str = "https://classic.yutorah.org";
const TITLE_PREFIX: &str = "YUTorah Online - ";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?yutorah\.org/").unwrap());

static DOWNLOAD_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https?://[^"'\s>]+\.mp3(?:\?[^"'\s<]*)?"#).unwrap()
});

// Tried in order after the `shiurid` query parameter.
static SHIUR_ID_REGEXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"/lectures/(\d+)").unwrap(),
        Regex::new(r"/sidebar/lecturedata/(\d+)").unwrap(),
        Regex::new(r"/(?:lectures|sidebar/lecturedata)/(?:details\?shiurid=)?(\d+)").unwrap(),
    ]
});

static RABBI_SUFFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\(Rabbi.*\)$").unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "main_page",
        url: "https://www.yutorah.org/lectures/1116616/Praying-for-Rain-and-the-International-Traveler",
        download_url: "https://download.yutorah.org/2024/986/1116616/praying-for-rain-and-the-international-traveler.mp3",
        title: "Praying for Rain and the International Traveler",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "short_link",
        url: "https://www.yutorah.org/lectures/1117459/",
        download_url: "https://download.yutorah.org/2024/986/1117459/davening-with-strep-throat.mp3",
        title: "Davening with Strep Throat",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "shiurid_link",
        url: "https://www.yutorah.org/lectures/details?shiurid=1117409",
        download_url: "https://download.yutorah.org/2024/21197/1117409/ketubot-42-dechitat-aveilut-1.mp3",
        title: "Ketubot 42: Dechitat Aveilut (1)",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "https://www.yutorah.org/lectures/details?shiurid=0000000",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

/// YUTorah lectures. The modern site renders client-side, so the shiur id is
/// looked up on the classic lecture iframe instead.
pub struct YutorahExtractor {
    client: HttpClient,
    classic_base: String,
}

impl YutorahExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            classic_base: CLASSIC_BASE.to_string(),
        }
    }

    pub fn with_classic_base(mut self, base: impl Into<String>) -> Self {
        self.classic_base = base.into();
        self
    }

    fn shiur_id(url: &str) -> Option<String> {
        let from_query = Url::parse(url).ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, v)| k == "shiurid" && !v.is_empty())
                .map(|(_, v)| v.into_owned())
        });
        if from_query.is_some() {
            return from_query;
        }

        SHIUR_ID_REGEXES
            .iter()
            .find_map(|re| re.captures(url))
            .map(|caps| caps[1].to_string())
    }

    fn parse_lecture_page(body: &str) -> Result<Extraction, ExtractError> {
        let found = DOWNLOAD_URL_REGEX
            .find(body)
            .ok_or_else(|| ExtractError::DownloadUrl("no mp3 link on lecture page".into()))?;

        let download_url = found.as_str().replace("-.mp3", ".mp3");
        let file_name = file_name_from_url(&download_url)
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();

        let title = Self::parse_title(body)
            .ok_or_else(|| ExtractError::Title("lecture page has no YUTorah title".into()))?;

        Ok(Extraction::new(download_url)
            .with_title(title)
            .with_file_format("audio/mp3")
            .with_file_name(file_name))
    }

    fn parse_title(body: &str) -> Option<String> {
        let doc = Html::parse_document(body);
        let page_title = select_text(&doc, "title")?;
        let title = page_title.strip_prefix(TITLE_PREFIX)?;
        let title = RABBI_SUFFIX_REGEX.replace(title, "");
        let title = title.trim();
        if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        }
    }
}

#[async_trait]
impl Extractor for YutorahExtractor {
    fn name(&self) -> &'static str {
        "YUTorah"
    }

    fn homepage(&self) -> &'static str {
        "https://yutorah.org"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let shiur_id = Self::shiur_id(url)
            .ok_or_else(|| ExtractError::Content(format!("no shiur id in {}", url)))?;

        let classic_url = format!("{}/lectures/lecture_iframe.cfm/{}", self.classic_base, shiur_id);
        debug!("YUTorah shiur {} -> {}", shiur_id, classic_url);

        let body = self.client.get_text(&classic_url).await?;
        Self::parse_lecture_page(&body)
    }
}
