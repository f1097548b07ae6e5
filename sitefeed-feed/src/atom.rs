//! Atom page parsing.

use crate::FeedError;
use crate::model::FeedEntry;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct AtomFeed {
    // Declared as a list so a feed with a single <entry> still yields a Vec.
    #[serde(rename = "entry", default)]
    entries: Vec<FeedEntry>,
}

/// Parse one page of an Atom feed into its entries, in document order.
///
/// An empty body or a `<feed>` without entries yields an empty list.
pub fn parse_page(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    if xml.trim().is_empty() {
        return Ok(Vec::new());
    }
    let feed: AtomFeed = quick_xml::de::from_str(xml)?;
    Ok(feed.entries)
}
