mod allparsha;
mod html;
mod id3;
mod kolhalashon;
mod mp3shiur;
mod nishmat;
mod orayta;
mod torahanytime;
mod torahapp;
mod torahmediaamerica;
mod torahweb;
mod types;
mod virtualbeitmidrash;
mod yutorah;

pub use allparsha::AllParshaExtractor;
pub use id3::read_title as read_id3_title;
pub use kolhalashon::KolHalashonExtractor;
pub use mp3shiur::Mp3ShiurExtractor;
pub use nishmat::NishmatExtractor;
pub use orayta::OraytaExtractor;
pub use torahanytime::TorahAnytimeExtractor;
pub use torahapp::TorahAppExtractor;
pub use torahmediaamerica::TorahMediaAmericaExtractor;
pub use torahweb::TorahWebExtractor;
pub use types::*;
pub use virtualbeitmidrash::VirtualBeitMidrashExtractor;
pub use yutorah::YutorahExtractor;

use crate::http::HttpClient;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

/// One supported site.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable site name
    fn name(&self) -> &'static str;

    fn homepage(&self) -> &'static str;

    /// Patterns for the URLs this extractor handles. Each is anchored at the
    /// scheme so only the site's own hosts match.
    fn url_patterns(&self) -> Vec<&'static Regex>;

    /// Known pages and what they should extract to
    fn examples(&self) -> &'static [ExtractionExample] {
        &[]
    }

    fn matches(&self, url: &str) -> bool {
        self.url_patterns().iter().any(|p| p.is_match(url))
    }

    /// Resolve a page URL into a direct download link. Callers are expected
    /// to have checked [`Extractor::matches`] first.
    async fn extract(&self, url: &str) -> Result<Extraction, ExtractError>;
}

/// Ordered set of extractors. The first one whose patterns match a URL
/// handles it.
pub struct Registry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl Registry {
    pub fn new(client: HttpClient) -> Self {
        // Site-dedicated extractors must come before anything broader.
        let extractors: Vec<Box<dyn Extractor>> = vec![
            Box::new(YutorahExtractor::new(client.clone())),
            Box::new(OraytaExtractor::new(client.clone())),
            Box::new(TorahAnytimeExtractor::new(client.clone())),
            Box::new(TorahAppExtractor::new(client.clone())),
            Box::new(KolHalashonExtractor::new(client.clone())),
            Box::new(Mp3ShiurExtractor::new(client.clone())),
            Box::new(NishmatExtractor::new(client.clone())),
            Box::new(VirtualBeitMidrashExtractor::new(client.clone())),
            Box::new(TorahMediaAmericaExtractor::new(client.clone())),
            Box::new(AllParshaExtractor::new(client.clone())),
            Box::new(TorahWebExtractor::new(client)),
        ];
        Self::with_extractors(extractors)
    }

    pub fn with_extractors(extractors: Vec<Box<dyn Extractor>>) -> Self {
        Self { extractors }
    }

    pub fn extractors(&self) -> &[Box<dyn Extractor>] {
        &self.extractors
    }

    pub fn find(&self, url: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.matches(url))
            .map(|e| e.as_ref())
    }

    /// Extract media information from a URL. Failures from the matched
    /// extractor are returned as-is.
    pub async fn resolve(&self, url: &str) -> Result<Extraction, ExtractError> {
        let Some(extractor) = self.find(url) else {
            debug!("No extractor matched {}", url);
            return Err(ExtractError::NoExtractor(url.to_string()));
        };

        info!("Extracting {} with {}", url, extractor.name());
        extractor.extract(url).await
    }

    pub fn supported_sites(&self) -> Vec<Site> {
        self.extractors
            .iter()
            .map(|e| Site {
                name: e.name().to_string(),
                homepage: e.homepage().to_string(),
            })
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(HttpClient::new())
    }
}

// Lives for the whole process so extractor caches do too.
static DEFAULT_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::default);

pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}

/// Extract media information from a URL using the built-in extractors.
///
/// The built-in registry shares one connection pool for the whole process,
/// and pooled connections are bound to the tokio runtime that opened them.
/// Code that runs several runtimes, such as a suite of `#[tokio::test]`s
/// hitting live sites, should build its own [`Registry`] per runtime.
pub async fn extract(url: &str) -> Result<Extraction, ExtractError> {
    DEFAULT_REGISTRY.resolve(url).await
}
