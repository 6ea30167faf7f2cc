use crate::types::{AnnouncerError, Category, NewsItem, Result};
use feed_rs::model::{Entry, Link, Text};
use feed_rs::parser;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Summaries are cut to this many characters before the truncation marker.
pub const MAX_SUMMARY_CHARS: usize = 300;
const TRUNCATION_MARKER: &str = "...";

fn img_src_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"<img [^>]*src="([^"]+)""#).expect("static regex"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<.*?>").expect("static regex"))
}

// Entries without a guid are keyed by their link so the id stays stable
// between polls of the same feed.
fn link_as_id(links: &[Link], _title: &Option<Text>, _uri: Option<&str>) -> String {
    links.first().map(|link| link.href.clone()).unwrap_or_default()
}

pub struct FeedParser;

impl FeedParser {
    /// Parse raw feed content into normalized items, newest first as the feed
    /// lists them, keeping at most `limit` entries.
    pub fn parse_items(content: &str, category: Category, limit: usize) -> Result<Vec<NewsItem>> {
        debug!("Parsing {} feed content ({} bytes)", category, content.len());

        let feed = parser::Builder::new()
            .id_generator(link_as_id)
            .build()
            .parse(content.as_bytes())
            .map_err(|e| AnnouncerError::Parse(format!("Failed to parse feed: {}", e)))?;

        let items: Vec<NewsItem> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::normalize_entry(entry, category))
            .take(limit)
            .collect();

        info!("Parsed {} {} items", items.len(), category);
        Ok(items)
    }

    fn normalize_entry(entry: Entry, category: Category) -> Option<NewsItem> {
        let Some(link) = entry.links.first().map(|l| l.href.trim().to_string()) else {
            debug!("Skipping entry {} without a link", entry.id);
            return None;
        };

        let id = if entry.id.trim().is_empty() {
            link.clone()
        } else {
            entry.id.trim().to_string()
        };

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());

        let summary_html = entry.summary.as_ref().map(|s| s.content.as_str()).unwrap_or("");
        let content_html = entry.content.as_ref().and_then(|c| c.body.as_deref());

        let image_url = Self::media_image(&entry)
            .or_else(|| Self::embedded_image(summary_html))
            .or_else(|| content_html.and_then(Self::embedded_image));

        let published = entry
            .published
            .or(entry.updated)
            .map(|dt| dt.to_rfc2822())
            .unwrap_or_default();

        Some(NewsItem {
            id,
            title,
            link,
            summary: Self::summarize(summary_html),
            image_url,
            published,
            category,
        })
    }

    fn media_image(entry: &Entry) -> Option<String> {
        entry
            .media
            .iter()
            .flat_map(|media| media.content.iter())
            .find_map(|content| {
                let url = content.url.as_ref()?.as_str();
                let is_image = content
                    .content_type
                    .as_ref()
                    .map(|mime| mime.type_().as_str() == "image")
                    .unwrap_or(true);
                is_image.then(|| url.to_string())
            })
    }

    /// First `<img src="...">` in a chunk of markup.
    pub fn embedded_image(html: &str) -> Option<String> {
        img_src_pattern()
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Strip markup, collapse whitespace and bound the length.
    pub fn summarize(html: &str) -> String {
        let text = Self::clean_html(html);
        if text.chars().count() <= MAX_SUMMARY_CHARS {
            return text;
        }
        let mut truncated: String = text.chars().take(MAX_SUMMARY_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    }

    pub fn clean_html(html: &str) -> String {
        tag_pattern()
            .replace_all(html, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
