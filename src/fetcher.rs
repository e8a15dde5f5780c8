use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Proxy};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use crate::model::{process_feed, Feed, FeedIndex, FeedProvider, FeedRetriever};
use crate::proxy::{proxy_url, EventualAddr};

/// Endpoint where the aggregated feed is published, `{locale}` is substituted.
pub const DEFAULT_ENDPOINT: &str = "https://feeds.getiantem.org/{locale}/feed.json";

pub const DEFAULT_LOCALE: &str = "en_US";

/// Locales that have their own published feed.
pub const SUPPORTED_LOCALES: [&str; 4] = ["en_US", "fa_IR", "fa", "zh_CN"];

#[derive(Debug, Error)]
pub enum FeedError {
    /// Building the client, sending the request or reading the body failed
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid proxy address '{addr}': {source}")]
    Proxy {
        addr: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Proxy address not available")]
    ProxyUnavailable,
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body was not a feed document
    #[error("Malformed feed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Falls back to [`DEFAULT_LOCALE`] for locales without a published feed.
pub fn resolve_locale(locale: &str) -> &str {
    if SUPPORTED_LOCALES.contains(&locale) {
        locale
    } else {
        DEFAULT_LOCALE
    }
}

pub struct FeedService {
    client: Client,
    endpoint: String,
    current: RwLock<Arc<FeedIndex>>,
    fetch_lock: Mutex<()>,
}

impl FeedService {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            current: RwLock::new(Arc::new(FeedIndex::default())),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn feed_url(&self, locale: &str) -> String {
        self.endpoint.replace("{locale}", resolve_locale(locale))
    }

    pub fn is_refreshing(&self) -> bool {
        self.fetch_lock.try_lock().is_err()
    }

    /// The most recently published index.
    pub async fn snapshot(&self) -> Arc<FeedIndex> {
        self.current.read().await.clone()
    }

    pub async fn sources(&self) -> Vec<String> {
        self.snapshot().await.sources.clone()
    }

    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().await.fetched_at
    }

    fn client_for(&self, proxy_addr: &str) -> Result<Client, FeedError> {
        if proxy_addr.is_empty() {
            return Ok(self.client.clone());
        }

        let proxy = Proxy::all(proxy_url(proxy_addr)).map_err(|source| FeedError::Proxy {
            addr: proxy_addr.to_string(),
            source,
        })?;
        let client = Client::builder().proxy(proxy).build()?;
        Ok(client)
    }

    /// Fetches the feed for `locale` and publishes a new index.
    ///
    /// An empty `proxy_addr` connects directly. On any failure the previous
    /// index stays in place and `provider` is not called. Returns the number
    /// of entries in the new feed.
    pub async fn get_feed(
        &self,
        locale: &str,
        proxy_addr: &str,
        provider: &mut impl FeedProvider,
    ) -> Result<usize, FeedError> {
        let _guard = self.fetch_lock.lock().await;

        let url = self.feed_url(locale);
        info!("Fetching feed: {}", url);

        let feed = match self.download(&url, proxy_addr).await {
            Ok(feed) => feed,
            Err(e) => {
                error!("Error fetching feed from {}: {}", url, e);
                return Err(e);
            }
        };

        let mut index = process_feed(feed, provider);
        index.fetched_at = Some(Utc::now());
        let count = index.entry_count();

        *self.current.write().await = Arc::new(index);
        info!("Loaded {} feed entries", count);
        Ok(count)
    }

    /// Like [`get_feed`](Self::get_feed), waiting up to `timeout` for the
    /// proxy address to become known.
    pub async fn get_feed_via(
        &self,
        locale: &str,
        proxy: &EventualAddr,
        timeout: Duration,
        provider: &mut impl FeedProvider,
    ) -> Result<usize, FeedError> {
        let Some(addr) = proxy.get(timeout).await else {
            error!("Error creating client: proxy address unavailable");
            return Err(FeedError::ProxyUnavailable);
        };
        self.get_feed(locale, &addr, provider).await
    }

    async fn download(&self, url: &str, proxy_addr: &str) -> Result<Feed, FeedError> {
        let client = self.client_for(proxy_addr)?;
        let response = client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        let feed = serde_json::from_slice(&bytes)?;
        Ok(feed)
    }

    /// Streams the items of group `name` to `retriever`, then calls `finish`.
    /// Unknown names produce no items.
    pub async fn feed_by_name(&self, name: &str, retriever: &mut impl FeedRetriever) {
        self.snapshot().await.visit(name, retriever);
    }
}

impl Default for FeedService {
    fn default() -> Self {
        Self::new()
    }
}
