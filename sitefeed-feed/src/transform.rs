//! Per-entry filter and rewrite.
//!
//! [`EntryTransformer::transform`] is a pure `FeedEntry -> Option<ValidatedFeedEntry>`
//! mapping. It drops entries without content and entries whose visible text
//! matches a noise pattern. Surviving entries get absolute links and have
//! embedded or executable markup removed, then pass through the sanitizer.
//! A failure inside the transform drops only that entry.

use crate::model::{FeedEntry, ValidatedFeedEntry};
use sitefeed_config::FeedSettings;
use sitefeed_sanitize::dom::{attr, attr_name, set_attr};
use sitefeed_sanitize::sanitizer::is_event_handler;
use sitefeed_sanitize::{Attribute, Fragment, SanitizeError, try_sanitize};

/// Elements removed with their subtree before serialization.
const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "iframe", "object", "embed"];

/// Final HTML pass applied to every rewritten entry.
pub type SanitizeFn = fn(&str) -> Result<String, SanitizeError>;

#[derive(Debug, Clone)]
pub struct EntryTransformer {
    origin: String,
    noise_patterns: Vec<String>,
    sanitize: SanitizeFn,
}

impl EntryTransformer {
    /// `origin` prefixes relative URLs; empty noise patterns are ignored.
    pub fn new(origin: &str, noise_patterns: &[String]) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            noise_patterns: noise_patterns
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            sanitize: try_sanitize,
        }
    }

    /// Replace the final sanitizer pass (defaults to [`try_sanitize`]). An
    /// error from it drops the entry.
    pub fn with_sanitizer(mut self, sanitize: SanitizeFn) -> Self {
        self.sanitize = sanitize;
        self
    }

    pub fn from_settings(settings: &FeedSettings) -> Self {
        Self::new(&settings.origin, &settings.noise_patterns)
    }

    pub fn transform(&self, entry: FeedEntry) -> Option<ValidatedFeedEntry> {
        let id = entry.id.clone();
        match self.try_transform(entry) {
            Ok(validated) => validated,
            Err(err) => {
                tracing::warn!(entry_id = %id, error = %err, "feed.entry.transform_failed");
                None
            }
        }
    }

    /// Filter-map a page worth of entries, keeping upstream order.
    pub fn transform_all(&self, entries: Vec<FeedEntry>) -> Vec<ValidatedFeedEntry> {
        entries
            .into_iter()
            .filter_map(|entry| self.transform(entry))
            .collect()
    }

    fn try_transform(&self, entry: FeedEntry) -> Result<Option<ValidatedFeedEntry>, SanitizeError> {
        let Some(html) = entry.content_html() else {
            tracing::debug!(entry_id = %entry.id, "feed.entry.no_content");
            return Ok(None);
        };

        let mut fragment = Fragment::parse(html)?;

        let text = fragment.text();
        if let Some(pattern) = self.noise_pattern_in(&text) {
            tracing::debug!(entry_id = %entry.id, pattern, "feed.entry.noise");
            return Ok(None);
        }

        fragment.remove_elements(|tag, attrs| {
            STRIPPED_ELEMENTS.contains(&tag) || (tag == "link" && is_relative_stylesheet(attrs))
        });
        fragment.for_each_element(|tag, attrs| {
            match tag {
                "a" => {
                    if let Some(href) = attr(attrs, "href").and_then(|h| self.absolute_href(h)) {
                        set_attr(attrs, "href", href);
                    }
                }
                "img" => {
                    if let Some(src) = attr(attrs, "src").and_then(|s| self.absolute_src(s)) {
                        set_attr(attrs, "src", src);
                    }
                }
                _ => {}
            }
            attrs.retain(|a| !is_event_handler(attr_name(a)));
        });

        let rewritten = fragment.to_html()?;
        // Consumers re-sanitize on render; a failure here drops the entry.
        let clean = (self.sanitize)(&rewritten)?;
        Ok(Some(ValidatedFeedEntry::promote(entry, clean)))
    }

    fn noise_pattern_in(&self, text: &str) -> Option<&str> {
        self.noise_patterns
            .iter()
            .map(String::as_str)
            .find(|pattern| text.contains(pattern))
    }

    /// Rewritten `<a href>`, or `None` when it is already absolute.
    fn absolute_href(&self, href: &str) -> Option<String> {
        if href.starts_with("http") {
            None
        } else {
            Some(self.join_origin(href))
        }
    }

    /// Rewritten `<img src>`, or `None` when it is already absolute.
    fn absolute_src(&self, src: &str) -> Option<String> {
        if src.starts_with("http") {
            None
        } else if src.starts_with("//") {
            Some(format!("https:{src}"))
        } else {
            Some(self.join_origin(src))
        }
    }

    fn join_origin(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.origin)
        } else {
            format!("{}/{path}", self.origin)
        }
    }
}

fn is_relative_stylesheet(attrs: &[Attribute]) -> bool {
    let is_stylesheet = attr(attrs, "rel").is_some_and(|rel| {
        rel.split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case("stylesheet"))
    });
    is_stylesheet && !attr(attrs, "href").is_some_and(|href| href.starts_with("http"))
}
