use super::html::{attr_values, collapse_whitespace, file_name_from_url, select_text};
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::sync::LazyLock;

const SITE_ROOT: &str = "https://www.torahweb.org";
const AUDIO_PATH: &str = "/torah/audio/";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?torahweb\.org/audio/[^/]+\.html").unwrap());

static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "torahweb_example",
        url: "https://www.torahweb.org/audio/rlop_062820.html",
        download_url: "https://www.torahweb.org/torah/audio/2020/coronavirus/rlop_062820.mp3",
        title: "A Positive Paradigm Shift Brought by COVID-19 (2020)",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "torahweb_example2",
        url: "https://torahweb.org/audio/rsch_091811.html",
        download_url: "https://www.torahweb.org/torah/audio/2011/teshuva/rsch_091811.mp3",
        title: "Teshuva: Serving Hashem HIS Way, Not Mine (2011)",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "https://www.torahweb.org/audio/invalid.html",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

pub struct TorahWebExtractor {
    client: HttpClient,
}

impl TorahWebExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn mp3_link(doc: &Html) -> Option<String> {
        let hrefs = attr_values(doc, "a[href]", "href");
        let site_audio = format!("{}{}", SITE_ROOT, AUDIO_PATH);

        let archived = hrefs.iter().find_map(|href| {
            if !href.ends_with(".mp3") {
                None
            } else if href.starts_with(AUDIO_PATH) {
                Some(format!("{}{}", SITE_ROOT, href))
            } else if href.starts_with(&site_audio) {
                Some(href.clone())
            } else {
                None
            }
        });
        if archived.is_some() {
            return archived;
        }

        hrefs
            .into_iter()
            .find(|href| href.contains(".mp3"))
            .map(|href| {
                if href.starts_with("http") {
                    href
                } else {
                    format!("{}{}", SITE_ROOT, href)
                }
            })
    }

    /// Shiur headings read `<h1><small>Rabbi ...</small>Title</h1>`; the
    /// title is the first text after the `<small>`.
    fn heading_title(doc: &Html) -> Option<String> {
        let h1 = Selector::parse("h1").ok()?;
        let h1 = doc.select(&h1).next()?;

        let mut after_small = false;
        for child in h1.children() {
            match child.value() {
                Node::Element(el) if el.name() == "small" => after_small = true,
                Node::Text(text) if after_small => {
                    let title = collapse_whitespace(text);
                    if !title.is_empty() {
                        return Some(title);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn parse_page(body: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(body);
        let download_url = Self::mp3_link(&doc)
            .ok_or_else(|| ExtractError::DownloadUrl("no mp3 link on page".into()))?;
        let file_name = file_name_from_url(&download_url);

        let extraction = Extraction::new(download_url)
            .with_file_format("audio/mp3")
            .with_file_name(file_name);
        Ok(match Self::heading_title(&doc).or_else(|| select_text(&doc, "title")) {
            Some(title) => extraction.with_title(title),
            None => extraction,
        })
    }
}

#[async_trait]
impl Extractor for TorahWebExtractor {
    fn name(&self) -> &'static str {
        "TorahWeb"
    }

    fn homepage(&self) -> &'static str {
        "https://www.torahweb.org"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_archive_page() {
        let page = r#"<html><head><title>TorahWeb.org: Rabbi Lopiansky</title></head><body>
            <h1><small>Rabbi Aharon Lopiansky</small>
                A Positive Paradigm Shift Brought by COVID-19 (2020)</h1>
            <a href="https://cdn.example.org/promo.mp3">promo</a>
            <a href="/torah/audio/2020/coronavirus/rlop_062820.mp3">Listen</a>
            </body></html>"#;

        let extraction = TorahWebExtractor::parse_page(page).unwrap();
        assert_eq!(
            extraction.download_url,
            "https://www.torahweb.org/torah/audio/2020/coronavirus/rlop_062820.mp3"
        );
        assert_eq!(
            extraction.title.as_deref(),
            Some("A Positive Paradigm Shift Brought by COVID-19 (2020)")
        );
        assert_eq!(extraction.file_name.as_deref(), Some("rlop_062820.mp3"));
    }

    #[test]
    fn test_falls_back_to_any_mp3_and_page_title() {
        let page = r#"<html><head><title>Teshuva</title></head><body>
            <h1>No small tag here</h1>
            <a href="/media/rsch_091811.mp3?dl=1">Download</a>
            </body></html>"#;

        let extraction = TorahWebExtractor::parse_page(page).unwrap();
        assert_eq!(
            extraction.download_url,
            "https://www.torahweb.org/media/rsch_091811.mp3?dl=1"
        );
        assert_eq!(extraction.title.as_deref(), Some("Teshuva"));
    }

    #[test]
    fn test_page_without_mp3() {
        let err = TorahWebExtractor::parse_page("<a href='/audio/'>audio</a>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DownloadUrlUnresolved);
    }
}
