//! Feed entry types.
//!
//! [`FeedEntry`] mirrors one Atom `<entry>` as the upstream sends it. Its
//! `content` is optional and unsanitized. [`ValidatedFeedEntry`] is the only
//! shape handed to consumers: content is present and has been through the
//! transform and sanitizer. It can only be built inside this crate.
//!
//! Field renames apply to deserialization only, so the JSON produced for
//! consumers uses plain field names (`kind`, `text`, `links`, ...).

use serde::{Deserialize, Serialize};

/// A text construct such as `<title type="html">...</title>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename(deserialize = "@type"), default)]
    pub kind: Option<String>,
    #[serde(rename(deserialize = "$text"), default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename(deserialize = "@href"), default)]
    pub href: String,
    #[serde(rename(deserialize = "@rel"), default)]
    pub rel: Option<String>,
    #[serde(rename(deserialize = "@type"), default)]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// Raw `<content>`; `text` is absent for an empty element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename(deserialize = "@type"), default)]
    pub kind: Option<String>,
    #[serde(rename(deserialize = "$text"), default)]
    pub text: Option<String>,
}

/// `<media:thumbnail>`, usually the actor's avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    #[serde(rename(deserialize = "@height"), default)]
    pub height: Option<String>,
    #[serde(rename(deserialize = "@url"), default)]
    pub url: String,
    #[serde(rename(deserialize = "@width"), default)]
    pub width: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Text,
    #[serde(default)]
    pub updated: String,
    /// Every `<link>` of the entry; a single link is still a one-element list.
    #[serde(rename(deserialize = "link"), default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(
        rename(deserialize = "thumbnail"),
        alias = "media:thumbnail",
        default
    )]
    pub thumbnail: Option<Thumbnail>,
}

impl FeedEntry {
    /// Canonical link of the entry: the `rel="alternate"` href, else the first link.
    pub fn alternate_link(&self) -> Option<&str> {
        alternate_link(&self.links)
    }

    /// Content HTML, if the entry is renderable at all.
    pub fn content_html(&self) -> Option<&str> {
        self.content.as_ref()?.text.as_deref()
    }
}

/// Sanitized `<content>` of a [`ValidatedFeedEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedContent {
    pub kind: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedFeedEntry {
    pub id: String,
    pub title: Text,
    pub updated: String,
    pub links: Vec<Link>,
    pub author: Option<Author>,
    content: ValidatedContent,
    pub published: Option<String>,
    pub thumbnail: Option<Thumbnail>,
}

impl ValidatedFeedEntry {
    /// Promote a raw entry, replacing its content with the sanitized `html`.
    pub(crate) fn promote(entry: FeedEntry, html: String) -> Self {
        let kind = entry.content.and_then(|c| c.kind);
        Self {
            id: entry.id,
            title: entry.title,
            updated: entry.updated,
            links: entry.links,
            author: entry.author,
            content: ValidatedContent { kind, text: html },
            published: entry.published,
            thumbnail: entry.thumbnail,
        }
    }

    pub fn content(&self) -> &ValidatedContent {
        &self.content
    }

    pub fn content_html(&self) -> &str {
        &self.content.text
    }

    pub fn alternate_link(&self) -> Option<&str> {
        alternate_link(&self.links)
    }
}

fn alternate_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.as_str())
        .filter(|href| !href.is_empty())
}
