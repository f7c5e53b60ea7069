//! Headline feed (RSS) client.
//!
//! Only `title`, `link` and `pubDate` of each `<item>` are read. Missing
//! fields get placeholders so every item is fully populated.

use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::provider::{DataError, HttpTransport};

pub const DEFAULT_NEWS_URL: &str = "https://finance.yahoo.com/rss/topstories";

pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// Empty when the feed item has no link.
    pub link: String,
    /// Publication date as written by the feed; empty when absent.
    pub published: String,
}

impl NewsItem {
    /// Synthetic item describing a fetch failure, so the news section is
    /// never an empty list.
    pub fn from_error(err: &DataError) -> Self {
        Self {
            title: format!("RSS error: {err}"),
            link: String::new(),
            published: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ItemField {
    Title,
    Link,
    Published,
}

#[derive(Debug, Default)]
struct PartialItem {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
}

impl PartialItem {
    fn slot(&mut self, field: ItemField) -> &mut Option<String> {
        match field {
            ItemField::Title => &mut self.title,
            ItemField::Link => &mut self.link,
            ItemField::Published => &mut self.published,
        }
    }

    fn finish(self) -> NewsItem {
        NewsItem {
            title: self.title.unwrap_or_else(|| UNTITLED.to_string()),
            link: self.link.unwrap_or_default(),
            published: self.published.unwrap_or_default(),
        }
    }
}

/// Parse up to `limit` items from an RSS document.
pub fn parse_rss(xml: &str, limit: usize) -> Result<Vec<NewsItem>, DataError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<PartialItem> = None;
    // Field whose text is being collected; only the first occurrence per item counts.
    let mut active: Option<ItemField> = None;

    while items.len() < limit {
        let event = reader
            .read_event()
            .map_err(|e| DataError::Parse(format!("malformed RSS: {e}")))?;

        match event {
            Event::Start(e) => {
                let field = match e.name().as_ref() {
                    b"item" => {
                        current = Some(PartialItem::default());
                        None
                    }
                    b"title" => Some(ItemField::Title),
                    b"link" => Some(ItemField::Link),
                    b"pubDate" => Some(ItemField::Published),
                    _ => None,
                };
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    let slot = item.slot(field);
                    if slot.is_none() {
                        *slot = Some(String::new());
                        active = Some(field);
                    }
                }
            }
            Event::Empty(e) => {
                // `<link/>` and friends: present but empty.
                let field = match e.name().as_ref() {
                    b"title" => Some(ItemField::Title),
                    b"link" => Some(ItemField::Link),
                    b"pubDate" => Some(ItemField::Published),
                    _ => None,
                };
                if let (Some(item), Some(field)) = (current.as_mut(), field) {
                    item.slot(field).get_or_insert_with(String::new);
                }
            }
            Event::Text(t) => {
                if let (Some(item), Some(field)) = (current.as_mut(), active) {
                    let text = t
                        .unescape()
                        .map_err(|e| DataError::Parse(format!("RSS text: {e}")))?;
                    if let Some(slot) = item.slot(field) {
                        slot.push_str(&text);
                    }
                }
            }
            Event::CData(c) => {
                if let (Some(item), Some(field)) = (current.as_mut(), active) {
                    let bytes = c.into_inner();
                    if let Some(slot) = item.slot(field) {
                        slot.push_str(&String::from_utf8_lossy(&bytes));
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"item" => {
                    if let Some(item) = current.take() {
                        items.push(item.finish());
                    }
                    active = None;
                }
                b"title" | b"link" | b"pubDate" => active = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// RSS headline feed.
pub struct RssFeed {
    transport: Arc<dyn HttpTransport>,
    url: String,
    limit: usize,
}

impl RssFeed {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>, limit: usize) -> Self {
        Self {
            transport,
            url: url.into(),
            limit,
        }
    }

    /// Fetch and parse the feed. A feed without items is reported as a
    /// schema mismatch.
    pub fn fetch(&self) -> Result<Vec<NewsItem>, DataError> {
        let body = self.transport.get_text(&self.url)?;
        let items = parse_rss(&body, self.limit)?;
        if items.is_empty() {
            return Err(DataError::SchemaMismatch(format!(
                "feed {} contains no items",
                self.url
            )));
        }
        info!(count = items.len(), "fetched headlines");
        Ok(items)
    }
}
