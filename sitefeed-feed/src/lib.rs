//! GitHub activity feed ingestion.
//!
//! - [`model`]: raw and validated entry types
//! - [`atom`]: Atom XML page parsing
//! - [`transform`]: per-entry noise filter, URL rewriting and sanitization
//! - [`source`]: the paginated upstream ([`FeedSource`], [`GithubFeedSource`])
//! - [`cache`]: the injectable cache capability and its in-memory implementation
//! - [`pipeline`]: [`FeedPipeline`], which ties them together
//!
//! ```no_run
//! # async fn demo() -> Result<(), sitefeed_feed::FeedError> {
//! use sitefeed_config::FeedSettings;
//! use sitefeed_feed::FeedPipeline;
//!
//! let pipeline = FeedPipeline::github(FeedSettings::default())?;
//! for entry in pipeline.fetch_feed_list().await {
//!     println!("{} {}", entry.updated, entry.title.text);
//! }
//! # Ok(()) }
//! ```

pub mod atom;
pub mod cache;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod transform;

pub use cache::{Clock, FeedCache, FeedList, ManualClock, MemoryCache, SystemClock};
pub use model::{FeedEntry, ValidatedFeedEntry};
pub use pipeline::FeedPipeline;
pub use source::{FeedSource, GithubFeedSource};
pub use transform::EntryTransformer;

use sitefeed_common::SitefeedError;
use sitefeed_http::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] HttpError),
    #[error("feed XML could not be parsed: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("invalid feed configuration: {0}")]
    Config(String),
}

impl From<FeedError> for SitefeedError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Config(msg) => SitefeedError::Config(msg),
            FeedError::Http(HttpError::Timeout(_)) => SitefeedError::Timeout,
            other => SitefeedError::Upstream(anyhow::Error::new(other)),
        }
    }
}
