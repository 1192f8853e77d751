use super::types::*;
use super::Extractor;
use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

const METADATA_URL: &str = "https://feeds.thetorahapp.org/data/podcasts_metadata.min.json";

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://(?:the)?torahapp\.org(?:[/?#:]|$)").unwrap());

static PODCAST_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/p/([^/]+)").unwrap());
static EPISODE_PATH_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/e/([^/]+)").unwrap());
static PODCAST_QUERY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"p=([^/&]+)").unwrap());
static EPISODE_QUERY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"e=([^/&]+)").unwrap());

static EXAMPLES: &[ExtractionExample] = &[ExtractionExample {
    name: "unknown_podcast",
    url: "https://torahapp.org/share/p/NO_SUCH_PODCAST/e/none:0",
    download_url: "",
    title: "",
    file_format: "",
    valid: false,
}];

#[derive(Debug, Deserialize)]
struct PodcastDirectory {
    podcasts: Vec<PodcastEntry>,
}

#[derive(Debug, Deserialize)]
struct PodcastEntry {
    #[serde(rename = "pId")]
    id: String,
    #[serde(rename = "u")]
    feed_url: Option<String>,
}

/// TorahApp share links name a podcast and an episode guid. The podcast is
/// looked up in the app's directory to find its RSS feed, and the feed is
/// scanned for the episode.
pub struct TorahAppExtractor {
    client: HttpClient,
    metadata_url: String,
    // podcast id -> feed url, fetched once per process
    feeds: OnceCell<HashMap<String, String>>,
}

impl TorahAppExtractor {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            metadata_url: METADATA_URL.to_string(),
            feeds: OnceCell::new(),
        }
    }

    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    async fn feeds(&self) -> Result<&HashMap<String, String>, ExtractError> {
        self.feeds
            .get_or_try_init(|| async {
                let directory: PodcastDirectory =
                    self.client.get_json(&self.metadata_url).await?;

                let feeds: HashMap<String, String> = directory
                    .podcasts
                    .into_iter()
                    .filter_map(|p| p.feed_url.map(|u| (p.id, u)))
                    .collect();
                info!("Loaded {} TorahApp podcast feeds", feeds.len());
                Ok(feeds)
            })
            .await
    }

    /// The single id found in the path and query. Query values are
    /// percent-decoded since episode guids are often URLs themselves.
    fn unique_id(
        parsed: &Url,
        path_regex: &Regex,
        query_regex: &Regex,
        what: &str,
    ) -> Result<String, ExtractError> {
        let mut ids = BTreeSet::new();
        for caps in path_regex.captures_iter(parsed.path()) {
            ids.insert(caps[1].trim().to_string());
        }
        if let Some(query) = parsed.query() {
            for caps in query_regex.captures_iter(query) {
                let value = urlencoding::decode(&caps[1])
                    .map_err(|e| ExtractError::Content(format!("bad {} id: {}", what, e)))?;
                ids.insert(value.trim().to_string());
            }
        }

        let mut ids = ids.into_iter();
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(id),
            (None, _) => Err(ExtractError::Content(format!("no {} id in {}", what, parsed))),
            (Some(_), Some(_)) => Err(ExtractError::Content(format!(
                "more than one {} id in {}",
                what, parsed
            ))),
        }
    }

    fn find_episode(feed: &str, episode_id: &str) -> Result<Extraction, ExtractError> {
        // Some feeds append an unescaped query string to YouTube guids,
        // which is not well-formed XML.
        let feed = feed.replace("&feature=youtu.be</guid>", "</guid>");
        let channel = rss::Channel::read_from(feed.as_bytes())
            .map_err(|e| ExtractError::Content(format!("bad podcast feed: {}", e)))?;

        let item = channel
            .items()
            .iter()
            .find(|item| item.guid().map(|g| g.value()) == Some(episode_id))
            .ok_or_else(|| {
                ExtractError::DownloadUrl(format!("episode {} is not in the feed", episode_id))
            })?;

        let enclosure = item.enclosure().ok_or_else(|| {
            ExtractError::DownloadUrl(format!("episode {} has no enclosure", episode_id))
        })?;
        let title = item
            .title()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ExtractError::Content(format!("episode {} has no title", episode_id)))?;

        let mut extraction = Extraction::new(enclosure.url())
            .with_title(title)
            .with_file_name(episode_id.replace('/', "_"));
        if !enclosure.mime_type().is_empty() {
            extraction = extraction.with_file_format(enclosure.mime_type());
        }
        Ok(extraction)
    }
}

#[async_trait]
impl Extractor for TorahAppExtractor {
    fn name(&self) -> &'static str {
        "TorahApp"
    }

    fn homepage(&self) -> &'static str {
        "https://torahapp.org"
    }

    fn url_patterns(&self) -> Vec<&'static Regex> {
        vec![&*URL_REGEX]
    }

    fn examples(&self) -> &'static [ExtractionExample] {
        EXAMPLES
    }

    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError> {
        let parsed =
            Url::parse(url).map_err(|e| ExtractError::Content(format!("{}: {}", url, e)))?;
        let podcast_id =
            Self::unique_id(&parsed, &PODCAST_PATH_REGEX, &PODCAST_QUERY_REGEX, "podcast")?;
        let episode_id =
            Self::unique_id(&parsed, &EPISODE_PATH_REGEX, &EPISODE_QUERY_REGEX, "episode")?;

        let feed_url = self.feeds().await?.get(&podcast_id).ok_or_else(|| {
            ExtractError::Content(format!("unknown TorahApp podcast {}", podcast_id))
        })?;
        debug!("TorahApp podcast {} -> {}", podcast_id, feed_url);

        let feed = self.client.get_text(feed_url).await?;
        Self::find_episode(&feed, &episode_id)
    }
}
