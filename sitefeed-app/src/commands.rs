use crate::OutputFormat;
use anyhow::{Context, Result};
use sitefeed_common::SitefeedError;
use sitefeed_config::FeedSettings;
use sitefeed_feed::{FeedPipeline, ValidatedFeedEntry};
use std::io::{Read, Write};

pub async fn fetch(settings: FeedSettings, format: OutputFormat) -> Result<()> {
    let pipeline = FeedPipeline::github(settings).map_err(SitefeedError::from)?;
    let entries = pipeline.fetch_feed_list().await;
    tracing::info!(entries = entries.len(), "app.fetch.done");

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(render(&entries, format)?.as_bytes())?;
    Ok(())
}

pub fn sanitize_stdin() -> Result<()> {
    let mut html = String::new();
    std::io::stdin()
        .read_to_string(&mut html)
        .context("reading HTML from stdin")?;
    let clean = sitefeed_sanitize::try_sanitize(&html)?;
    std::io::stdout().lock().write_all(clean.as_bytes())?;
    Ok(())
}

fn render(entries: &[ValidatedFeedEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)? + "\n"),
        OutputFormat::Text if entries.is_empty() => Ok("No recent activity.\n".to_string()),
        OutputFormat::Text => Ok(entries
            .iter()
            .map(|e| {
                let link = e.alternate_link().unwrap_or("-");
                format!("{}  {}\n    {}\n", e.updated, e.title.text, link)
            })
            .collect()),
    }
}
