use super::html::select_first_text;
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

const CDN_BASE: &str = "https://torahcdn.net/tdn";

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?torahmediaamerica\.com/shiur-[\w-]+\.html").unwrap()
});

static SHIUR_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/shiur-([\w-]+)\.html").unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "main_page",
        url: "http://torahmediaamerica.com/shiur-1024531.html",
        download_url: "https://torahcdn.net/tdn/1024531.mp3",
        title: "01 Introduction to Shoftim (Rus) (2013)",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "another_page",
        url: "http://torahmediaamerica.com/shiur-1025096.html",
        download_url: "https://torahcdn.net/tdn/1025096.mp3",
        title: "Covering Hair and Negiya shel Chiba (Ohr Lagolah 5776)",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "http://torahmediaamerica.com/shiur-foobar.html",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

/// Shiurim are served from the CDN under their numeric id. The page is only
/// fetched for the title.
pub struct TorahMediaAmericaExtractor {
    client: HttpClient,
}

impl TorahMediaAmericaExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn shiur_id(url: &str) -> Result<String, ExtractError> {
        let id = SHIUR_ID_REGEX
            .captures(url)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ExtractError::DownloadUrl(format!("no shiur id in {}", url)))?;
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ExtractError::DownloadUrl(format!("shiur id {} is not numeric", id)));
        }
        Ok(id)
    }

    fn parse_title(body: &str) -> Option<String> {
        let doc = Html::parse_document(body);
        let title = select_first_text(&doc, &["h2", "h1", "title", "div.title"])?;
        let title = title.split(" - ").next().unwrap_or_default().trim();
        if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        }
    }
}

#[async_trait]
impl Extractor for TorahMediaAmericaExtractor {
    fn name(&self) -> &'static str {
        "TorahMediaAmerica"
    }

    fn homepage(&self) -> &'static str {
        "http://torahmediaamerica.com"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let shiur_id = Self::shiur_id(url)?;

        // A shiur page that cannot be loaded means the id does not exist.
        let body = self
            .client
            .get_text(url)
            .await
            .map_err(|e| ExtractError::DownloadUrl(e.to_string()))?;

        let extraction = Extraction::new(format!("{}/{}.mp3", CDN_BASE, shiur_id))
            .with_file_format("audio/mp3")
            .with_file_name(format!("{}.mp3", shiur_id));
        Ok(match Self::parse_title(&body) {
            Some(title) => extraction.with_title(title),
            None => extraction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_shiur_id_must_be_numeric() {
        assert_eq!(
            TorahMediaAmericaExtractor::shiur_id("http://torahmediaamerica.com/shiur-1024531.html")
                .unwrap(),
            "1024531"
        );
        let err =
            TorahMediaAmericaExtractor::shiur_id("http://torahmediaamerica.com/shiur-foobar.html")
                .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DownloadUrlUnresolved);
    }

    #[test]
    fn test_title_is_cut_at_separator() {
        let page = r#"<html><head><title>Ignored</title></head><body>
            <h2>  </h2>
            <h1>01 Introduction to Shoftim (Rus) (2013) - Rabbi Example - TorahMediaAmerica</h1>
            </body></html>"#;
        assert_eq!(
            TorahMediaAmericaExtractor::parse_title(page).as_deref(),
            Some("01 Introduction to Shoftim (Rus) (2013)")
        );
        assert_eq!(TorahMediaAmericaExtractor::parse_title("<p>nothing</p>"), None);
    }

    #[tokio::test]
    async fn test_extract_builds_cdn_url() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/shiur-1025096.html");
            then.status(200).body(
                "<h2>Covering Hair and Negiya shel Chiba (Ohr Lagolah 5776) - Rabbi Example</h2>",
            );
        });

        let extraction = TorahMediaAmericaExtractor::new(HttpClient::new())
            .extract(&server.url("/shiur-1025096.html"))
            .await
            .unwrap();
        assert_eq!(extraction.download_url, "https://torahcdn.net/tdn/1025096.mp3");
        assert_eq!(
            extraction.title.as_deref(),
            Some("Covering Hair and Negiya shel Chiba (Ohr Lagolah 5776)")
        );
        assert_eq!(extraction.file_name.as_deref(), Some("1025096.mp3"));
    }

    #[tokio::test]
    async fn test_missing_page_is_download_url_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/shiur-1024531.html");
            then.status(404);
        });

        let err = TorahMediaAmericaExtractor::new(HttpClient::new())
            .extract(&server.url("/shiur-1024531.html"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DownloadUrlUnresolved);
    }
}
