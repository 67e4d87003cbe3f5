//! Per-post image discovery, download and local naming.
//!
//! One [`ImageSet`] is built per post: every distinct `img[src]` URL in the
//! body gets exactly one fetch and one collision-safe local name, so repeated
//! references share a single file. Fetching goes through the [`ImageFetcher`]
//! trait so tests can swap the network out for a mock; the production
//! implementation is a reqwest client with a bounded per-request timeout.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use mockall::automock;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::slug::sanitize;

/// Timeout applied to every individual image request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-image failures. Never fatal: the post keeps the remote URL instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageFetchError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("failed to read image body: {0}")]
    Body(String),
}

/// Transport seam for image downloads.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetches one image, returning its raw bytes.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageFetchError>;
}

/// Production fetcher over reqwest.
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<HttpImageFetcher, ImageFetchError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ImageFetchError::Transport(e.to_string()))?;
        Ok(HttpImageFetcher { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageFetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageFetchError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError::Status(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageFetchError::Body(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// One image of a post: remote URL, assigned local name, and the payload when
/// the fetch succeeded.
#[derive(Debug, Clone)]
pub struct ResolvedImage {
    pub source_url: String,
    pub local_name: String,
    pub bytes: Option<Vec<u8>>,
}

/// All images of one post, keyed by source URL. Scoped to a single post;
/// dropped once the post's files are written.
#[derive(Debug, Default)]
pub struct ImageSet {
    images: Vec<ResolvedImage>,
    by_url: HashMap<String, usize>,
    failures: Vec<(String, ImageFetchError)>,
}

impl ImageSet {
    pub fn empty() -> ImageSet {
        ImageSet::default()
    }

    /// The Markdown reference target for an `img[src]`: the post-local path
    /// when the image was fetched, the original remote URL otherwise.
    pub fn markdown_target(&self, source_url: &str) -> String {
        match self.by_url.get(source_url) {
            Some(&i) if self.images[i].bytes.is_some() => {
                format!("images/{}", self.images[i].local_name)
            }
            _ => source_url.to_string(),
        }
    }

    /// Successfully fetched images, in discovery order.
    pub fn fetched(&self) -> impl Iterator<Item = &ResolvedImage> {
        self.images.iter().filter(|img| img.bytes.is_some())
    }

    pub fn failures(&self) -> &[(String, ImageFetchError)] {
        &self.failures
    }
}

/// Distinct `img[src]` URLs of a parsed body, in document order. Images with
/// an empty `src` are ignored (the converter drops them too).
pub fn discover(doc: &Html) -> Vec<String> {
    let img = Selector::parse("img").unwrap();
    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for element in doc.select(&img) {
        if let Some(src) = element.value().attr("src") {
            if !src.is_empty() && seen.insert(src.to_string()) {
                sources.push(src.to_string());
            }
        }
    }
    sources
}

fn trailing_segment(source_url: &str) -> String {
    let path = match Url::parse(source_url) {
        Ok(url) => url.path().to_string(),
        // Relative or otherwise odd reference: strip query/fragment by hand.
        Err(_) => source_url
            .split(['?', '#'])
            .next()
            .unwrap_or("")
            .to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Local filename for a remote image URL: the cleaned trailing path segment,
/// extension kept (`.jpg` when there is none), suffixed `-2`, `-3`, … when a
/// distinct URL cleans to a name already used in this post.
fn local_name_for(source_url: &str, used: &mut HashSet<String>) -> String {
    let segment = trailing_segment(source_url);
    let (stem, ext) = match segment.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !stem.is_empty() => {
            let cleaned: String = ext
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .flat_map(char::to_lowercase)
                .collect();
            if cleaned.is_empty() {
                (sanitize(stem), ".jpg".to_string())
            } else {
                let mut ext = format!(".{cleaned}");
                ext.truncate(5);
                (sanitize(stem), ext)
            }
        }
        _ => (sanitize(&segment), ".jpg".to_string()),
    };
    let stem = if stem.is_empty() {
        "image".to_string()
    } else {
        stem
    };

    let bare = format!("{stem}{ext}");
    if used.insert(bare.clone()) {
        return bare;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{stem}-{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Assigns local names to the given distinct URLs and fetches them all
/// concurrently. Failures are recorded, never propagated.
pub async fn resolve(sources: &[String], fetcher: &dyn ImageFetcher) -> ImageSet {
    let mut set = ImageSet::empty();
    let mut used = HashSet::new();

    for source_url in sources {
        let local_name = local_name_for(source_url, &mut used);
        set.by_url.insert(source_url.clone(), set.images.len());
        set.images.push(ResolvedImage {
            source_url: source_url.clone(),
            local_name,
            bytes: None,
        });
    }

    let fetches = set
        .images
        .iter()
        .map(|img| fetcher.fetch(&img.source_url));
    let results = join_all(fetches).await;

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(bytes) => {
                debug!(
                    url = %set.images[i].source_url,
                    local_name = %set.images[i].local_name,
                    size = bytes.len(),
                    "Fetched image"
                );
                set.images[i].bytes = Some(bytes);
            }
            Err(e) => {
                warn!(url = %set.images[i].source_url, error = %e, "Image fetch failed, keeping remote URL");
                set.failures.push((set.images[i].source_url.clone(), e));
            }
        }
    }

    set
}
