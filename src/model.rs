use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Grouping key holding every entry in published order.
pub const ALL_ITEMS: &str = "all";

/// Maximum number of characters kept from an entry's description.
pub const MAX_DESCRIPTION_CHARS: usize = 150;

/// The document published at the feed endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default, deserialize_with = "null_as_default")]
    pub feeds: BTreeMap<String, Source>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<FeedItem>,
}

/// A content origin, e.g. a news outlet, referencing entries by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "feedUrl", default, deserialize_with = "null_as_default")]
    pub feed_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "link", default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub image: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "HashMap::is_empty"
    )]
    pub meta: HashMap<String, Value>,
    /// Trimmed and shortened `meta.description`, filled in by [`process_feed`].
    #[serde(skip)]
    pub description: String,
}

/// Reads an explicit `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Receives the source titles discovered while processing a feed.
pub trait FeedProvider {
    fn add_source(&mut self, name: &str);
}

/// Receives the items of one group, followed by a single `finish`.
pub trait FeedRetriever {
    fn add_feed(&mut self, title: &str, description: &str, image: &str, link: &str);
    fn finish(&mut self);
}

impl FeedProvider for Vec<String> {
    fn add_source(&mut self, name: &str) {
        self.push(name.to_string());
    }
}

/// An item as handed to a retriever, used when results are collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
}

impl Article {
    /// Whether `link` is safe to render as a clickable `http`/`https` URL.
    pub fn has_web_link(&self) -> bool {
        reqwest::Url::parse(&self.link)
            .map(|url| matches!(url.scheme(), "http" | "https"))
            .unwrap_or(false)
    }
}

impl FeedRetriever for Vec<Article> {
    fn add_feed(&mut self, title: &str, description: &str, image: &str, link: &str) {
        self.push(Article {
            title: title.to_string(),
            description: description.to_string(),
            image: image.to_string(),
            link: link.to_string(),
        });
    }

    fn finish(&mut self) {}
}

/// Entries grouped for lookup, built from one fetched [`Feed`].
#[derive(Debug, Clone, Default)]
pub struct FeedIndex {
    pub items: HashMap<String, Vec<FeedItem>>,
    /// Distinct non-empty source titles, in the order they were reported.
    pub sources: Vec<String>,
    /// Source references that pointed past the end of `entries`.
    pub dangling: usize,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl FeedIndex {
    pub fn get(&self, name: &str) -> Option<&[FeedItem]> {
        self.items.get(name).map(Vec::as_slice)
    }

    pub fn entry_count(&self) -> usize {
        self.get(ALL_ITEMS).map_or(0, <[FeedItem]>::len)
    }

    /// Streams the items of group `name` to `retriever`, then calls `finish`.
    /// Unknown names produce no items.
    pub fn visit(&self, name: &str, retriever: &mut impl FeedRetriever) {
        if let Some(items) = self.get(name) {
            for item in items {
                retriever.add_feed(&item.title, &item.description, &item.image, &item.link);
            }
        }
        retriever.finish();
    }
}

/// Trims a description and keeps at most [`MAX_DESCRIPTION_CHARS`] characters.
pub fn shorten_description(raw: &str) -> String {
    raw.trim().chars().take(MAX_DESCRIPTION_CHARS).collect()
}

fn description_of(item: &FeedItem) -> String {
    match item.meta.get("description") {
        Some(Value::String(desc)) => shorten_description(desc),
        _ => String::new(),
    }
}

/// Builds the lookup index for a freshly decoded feed and reports its sources.
pub fn process_feed(mut feed: Feed, provider: &mut impl FeedProvider) -> FeedIndex {
    debug!("Num of feed entries: {}", feed.entries.len());

    for entry in feed.entries.iter_mut() {
        entry.description = description_of(entry);
    }

    let mut index = FeedIndex::default();
    let mut seen = HashSet::new();

    for source in feed.feeds.values() {
        if !source.title.is_empty() && seen.insert(source.title.as_str()) {
            debug!("Adding feed source: {}", source.title);
            provider.add_source(&source.title);
            index.sources.push(source.title.clone());
        }
    }

    index
        .items
        .insert(ALL_ITEMS.to_string(), feed.entries.clone());

    for (id, source) in &feed.feeds {
        for &position in &source.entries {
            match feed.entries.get(position) {
                Some(entry) => index
                    .items
                    .entry(source.title.clone())
                    .or_default()
                    .push(entry.clone()),
                None => {
                    warn!(
                        "Source '{}' references missing entry {} (feed has {})",
                        id,
                        position,
                        feed.entries.len()
                    );
                    index.dangling += 1;
                }
            }
        }
    }

    index
}
