use super::html::select_first_text;
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::debug;

const MEDIA_BASE: &str = "https://media.ou.org/torah";
const DOWNLOAD_ENDPOINT: &str = "https://outorah.org/download";

static ALLPARSHA_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?allparsha\.org/").unwrap());

static ALLDAF_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?alldaf\.org/").unwrap());

static POST_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/p/(\d+)/?$").unwrap());

static SERIES_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/series/(\d+)").unwrap());

// Tried against the raw page when no series link is present.
static SERIES_SOURCE_REGEXES: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"series/(\d+)").unwrap(),
        Regex::new(r#"seriesId["']?\s*:\s*["']?(\d+)"#).unwrap(),
        Regex::new(r#"data-series-id["']?\s*=\s*["']?(\d+)"#).unwrap(),
    ]
});

const SERIES_TITLE_SELECTORS: &[&str] = &[
    ".series-title",
    ".series__title",
    ".breadcrumb a[href*='/series/']",
    ".post__header a[href*='/series/']",
    "a[href*='/series/']",
];

const POST_TITLE_SELECTORS: &[&str] = &[
    ".post-title",
    ".post__title",
    "h1",
    ".title",
    ".post-header h1",
    ".post__header h1",
];

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "main_page",
        url: "https://allparsha.org/p/197738",
        download_url: "https://outorah.org/download?title=Aliya%20Outlines%20-%20Mishpatim%206%20-%20The%20Angel%20Leading%20to%20the%20Land&s3Url=https%3A//media.ou.org/torah/4134/197738/197738.mp3",
        title: "Aliya Outlines - Mishpatim 6 - The Angel Leading to the Land",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "another_page",
        url: "https://allparsha.org/p/85859",
        download_url: "https://outorah.org/download?title=The%20Quick%20Parsha%20with%20Rabbi%20Zecharia%20Resnik%20-%20Shelach%20-%20Shishi&s3Url=https%3A//media.ou.org/torah/4106/85859/85859.mp3",
        title: "The Quick Parsha with Rabbi Zecharia Resnik - Shelach - Shishi",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "https://allparsha.org/p/000000",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

/// Percent-encode everything except unreserved characters and `/`, the
/// escaping the OU download endpoint expects.
fn quote(s: &str) -> String {
    urlencoding::encode(s).replace("%2F", "/")
}

/// OU's AllParsha and AllDaf sites. Their media lives on OU's S3 bucket
/// keyed by series and post id, and is fetched through OU's download
/// endpoint.
pub struct AllParshaExtractor {
    client: HttpClient,
}

impl AllParshaExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn post_id(url: &str) -> Result<String, ExtractError> {
        POST_ID_REGEX
            .captures(url)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ExtractError::DownloadUrl(format!("no post id in {}", url)))
    }

    fn series_id(doc: &Html, body: &str) -> Result<String, ExtractError> {
        let from_link = Selector::parse(r#"a[href*="/series/"]"#).ok().and_then(|sel| {
            let href = doc.select(&sel).next()?.value().attr("href")?;
            SERIES_LINK_REGEX.captures(href).map(|caps| caps[1].to_string())
        });
        if let Some(id) = from_link {
            return Ok(id);
        }

        SERIES_SOURCE_REGEXES
            .iter()
            .find_map(|re| re.captures(body))
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ExtractError::DownloadUrl("no series id on page".into()))
    }

    fn parse_page(body: &str, post_id: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(body);

        let series_title = select_first_text(&doc, SERIES_TITLE_SELECTORS);
        let post_title = select_first_text(&doc, POST_TITLE_SELECTORS);
        let (Some(series_title), Some(post_title)) = (series_title, post_title) else {
            return Err(ExtractError::DownloadUrl(
                "page is missing the series or post title".into(),
            ));
        };
        let title = format!("{} - {}", series_title, post_title);

        let series_id = Self::series_id(&doc, body)?;
        let s3_url = format!("{}/{}/{}/{}.mp3", MEDIA_BASE, series_id, post_id, post_id);
        debug!("AllParsha post {} is in series {}", post_id, series_id);

        Ok(Extraction::new(format!(
            "{}?title={}&s3Url={}",
            DOWNLOAD_ENDPOINT,
            quote(&title),
            quote(&s3_url)
        ))
        .with_title(title)
        .with_file_format("audio/mp3")
        .with_file_name(format!("{}.mp3", post_id)))
    }
}

#[async_trait]
impl Extractor for AllParshaExtractor {
    fn name(&self) -> &'static str {
        "AllParsha"
    }

    fn homepage(&self) -> &'static str {
        "https://allparsha.org"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*ALLPARSHA_URL_REGEX, &*ALLDAF_URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let body = self.client.get_text(url).await?;
        let post_id = Self::post_id(url)?;
        Self::parse_page(&body, &post_id)
    }
}
