use super::html::{attr_values, file_name_from_url, meta_content, select_text};
use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use tracing::debug;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?etzion\.org\.il/").unwrap());

// Unanchored so it can also be searched for in raw page source.
static MP3_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^"']+\.mp3"#).unwrap());

static YOUTUBE_EMBED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://www\.youtube\.com/embed/[\w-]+\?wmode=opaque").unwrap()
});

// The site sits behind bot protection, so these only pass from a browser-like
// network position.
static EXAMPLES: &[ExtractionExample] = &[
    ExtractionExample {
        name: "etzion_audio_page",
        url: "https://etzion.org.il/en/tanakh/ketuvim/megillat-ruth/megilat-hahessed-ruth-avraham-and-meaning-hessed",
        download_url: "https://traffic.libsyn.com/secure/kmtt/RYEtshalom_megilat-hahessed-ruth-avraham-and-the-meaning-of-hessed.mp3",
        title: "Megilat haHessed - Ruth, Avraham and the Meaning of Hessed",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "etzion_video_page",
        url: "https://etzion.org.il/en/tanakh/ketuvim/sefer-tehillim/tehillim-center-tefilla",
        download_url: "https://www.youtube.com/embed/-l6Tlqg2syc?wmode=opaque",
        title: "Tehillim at the Center of Tefilla",
        file_format: "video/youtube",
        valid: true,
    },
    ExtractionExample {
        name: "etzion_audio_page_2",
        url: "https://etzion.org.il/en/talmud/seder-zeraim/massekhet-berakhot/connecting-redemption-tefilla",
        download_url: "http://traffic.libsyn.com/kmtt/wed_10_05_06-ebick_berachot01.mp3",
        title: "Connecting the Redemption to Tefilla",
        file_format: "audio/mp3",
        valid: true,
    },
    ExtractionExample {
        name: "invalid_link",
        url: "https://etzion.org.il/en/invalid-page",
        download_url: "",
        title: "",
        file_format: "",
        valid: false,
    },
];

/// The Israel Koschitzky Virtual Beit Midrash at Yeshivat Har Etzion.
/// Pages carry either an embedded YouTube video or an mp3.
pub struct VirtualBeitMidrashExtractor {
    client: HttpClient,
}

impl VirtualBeitMidrashExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    fn title(doc: &Html) -> Option<String> {
        let title = meta_content(doc, r#"meta[property="og:title"]"#)
            .or_else(|| select_text(doc, "title"))?;
        let title = title.split('|').next().unwrap_or_default().trim();
        if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        }
    }

    fn youtube_embed(doc: &Html) -> Option<String> {
        attr_values(doc, "iframe[src]", "src")
            .into_iter()
            .find(|src| YOUTUBE_EMBED_REGEX.is_match(src))
    }

    /// Anchors first, then `<audio>` sources, then anything mp3-shaped in
    /// the page source.
    fn audio_link(doc: &Html, body: &str) -> Option<String> {
        let is_mp3 = |s: &String| MP3_REGEX.find(s).is_some_and(|m| m.start() == 0);

        attr_values(doc, "a[href]", "href")
            .into_iter()
            .find(is_mp3)
            .or_else(|| attr_values(doc, "audio[src]", "src").into_iter().find(is_mp3))
            .or_else(|| MP3_REGEX.find(body).map(|m| m.as_str().to_string()))
    }

    fn parse_page(body: &str) -> Result<Extraction, ExtractError> {
        let doc = Html::parse_document(body);
        let title = Self::title(&doc);

        let extraction = if let Some(video) = Self::youtube_embed(&doc) {
            debug!("Found YouTube embed {}", video);
            Extraction::new(video).with_file_format("video/youtube")
        } else if let Some(audio) = Self::audio_link(&doc, body) {
            let file_name = file_name_from_url(&audio);
            Extraction::new(audio)
                .with_file_format("audio/mp3")
                .with_file_name(file_name)
        } else {
            return Err(ExtractError::DownloadUrl(
                "no YouTube embed or mp3 link on page".into(),
            ));
        };

        Ok(match title {
            Some(title) => extraction.with_title(title),
            None => extraction,
        })
    }
}

#[async_trait]
impl Extractor for VirtualBeitMidrashExtractor {
    fn name(&self) -> &'static str {
        "Virtual Beit Midrash (Etzion)"
    }

    fn homepage(&self) -> &'static str {
        "https://etzion.org.il"
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
