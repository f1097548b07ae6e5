#![allow(dead_code)]

use async_trait::async_trait;
use sitefeed_common::observability::{LogConfig, LogFormat};
use sitefeed_feed::{FeedError, FeedSource};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "sitefeed-tests",
            emit_stderr: true,
            format: if std::env::var("SITEFEED_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".into(),
            ..LogConfig::default()
        };

        sitefeed_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// Escape HTML for embedding as Atom `<content type="html">` text.
pub fn xml_escape(html: &str) -> String {
    html.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// An Atom page with one entry per content snippet.
pub fn atom_page(page: u32, contents: &[&str]) -> String {
    let entries: String = contents
        .iter()
        .enumerate()
        .map(|(i, html)| {
            format!(
                r#"<entry>
    <id>tag:github.com,2008:Event/{page}{i}</id>
    <updated>2024-05-0{page}T10:00:0{i}Z</updated>
    <link type="text/html" rel="alternate" href="https://github.com/ryota-murakami/site/pull/{page}{i}"/>
    <title type="html">event {page}.{i}</title>
    <content type="html">{}</content>
  </entry>"#,
                xml_escape(html)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <id>tag:github.com,2008:/ryota-murakami</id>
  <title>GitHub Public Timeline Feed</title>
  {entries}
</feed>"#
    )
}

/// Page with `n` clean entries.
pub fn clean_page(page: u32, n: usize) -> String {
    let contents: Vec<String> = (0..n).map(|i| format!("<p>Released v{page}.{i}</p>")).collect();
    let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
    atom_page(page, &refs)
}

pub enum Scripted {
    Body(String),
    Fail,
}

/// In-memory upstream that replays a fixed list of pages and counts calls.
pub struct ScriptedSource {
    pages: Vec<Scripted>,
    latency: Duration,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Scripted>) -> Self {
        Self {
            pages,
            latency: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for ScriptedSource {
    async fn fetch_page(&self, page: u32) -> Result<String, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.pages.get(page as usize - 1) {
            Some(Scripted::Body(body)) => Ok(body.clone()),
            Some(Scripted::Fail) => Err(FeedError::Config(format!("page {page} unavailable"))),
            None => Ok(atom_page(page, &[])),
        }
    }
}
