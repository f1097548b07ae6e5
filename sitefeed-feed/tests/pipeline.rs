mod common;

use common::{Scripted, ScriptedSource, atom_page, clean_page, init_test_tracing};
use sitefeed_config::FeedSettings;
use sitefeed_feed::{FeedCache, FeedPipeline, ManualClock, MemoryCache};
use std::sync::Arc;
use std::time::Duration;

fn settings() -> FeedSettings {
    FeedSettings {
        page_delay_ms: 0,
        ..FeedSettings::default()
    }
}

fn pipeline_with(source: Arc<ScriptedSource>) -> (FeedPipeline, Arc<ManualClock>) {
    init_test_tracing();
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(MemoryCache::new(clock.clone()));
    (FeedPipeline::new(source, cache, settings()), clock)
}

#[tokio::test]
async fn keeps_clean_entry_and_drops_noise() {
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(atom_page(
        1,
        &["<p>Released v1.0</p>", "<p>Bump lodash to 4.0.1</p>"],
    ))]));
    let (pipeline, _) = pipeline_with(source.clone());

    let entries = pipeline.fetch_feed_list().await;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content_html(), "<p>Released v1.0</p>");
    assert_eq!(
        entries[0].alternate_link(),
        Some("https://github.com/ryota-murakami/site/pull/10")
    );
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn filters_every_noise_variant() {
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(atom_page(
        1,
        &[
            "<p>Dependabot opened #12</p>",
            "<p>dependabot[bot] pushed</p>",
            "<p>Bump axios</p>",
            "<p>bump deps</p>",
            "<p>created hayashima-notes</p>",
        ],
    ))]));
    let (pipeline, _) = pipeline_with(source);
    assert!(pipeline.fetch_feed_list().await.is_empty());
}

#[tokio::test]
async fn rewrites_relative_urls() {
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(atom_page(
        1,
        &[r#"<div><a href="/x/y">repo</a><img src="//cdn/a.png" alt="a"></div>"#],
    ))]));
    let (pipeline, _) = pipeline_with(source);

    let entries = pipeline.fetch_feed_list().await;
    let html = entries[0].content_html();
    assert!(html.contains(r#"href="https://github.com/x/y""#), "{html}");
    assert!(html.contains(r#"src="https://cdn/a.png""#), "{html}");
}

#[tokio::test]
async fn entries_without_content_never_surface() {
    let xml = r#"<feed>
  <entry><id>no-content</id><title>t</title></entry>
  <entry><id>empty-content</id><content type="html"></content></entry>
  <entry><id>ok</id><content type="html">&lt;p&gt;hello&lt;/p&gt;</content></entry>
</feed>"#;
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(xml.to_string())]));
    let (pipeline, _) = pipeline_with(source);

    let ids: Vec<String> = pipeline
        .fetch_feed_list()
        .await
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, ["ok"]);
}

#[tokio::test]
async fn empty_third_page_means_three_fetches_at_most() {
    let source = Arc::new(ScriptedSource::new(vec![
        Scripted::Body(clean_page(1, 5)),
        Scripted::Body(clean_page(2, 5)),
        Scripted::Body(atom_page(3, &[])),
        Scripted::Body(clean_page(4, 5)),
    ]));
    let (pipeline, _) = pipeline_with(source.clone());

    assert_eq!(pipeline.fetch_feed_list().await.len(), 10);
    assert!(source.calls() <= 3);
}

#[tokio::test]
async fn short_second_page_stops_pagination() {
    let source = Arc::new(ScriptedSource::new(vec![
        Scripted::Body(clean_page(1, 5)),
        Scripted::Body(clean_page(2, 4)),
        Scripted::Body(clean_page(3, 5)),
    ]));
    let (pipeline, _) = pipeline_with(source.clone());

    assert_eq!(pipeline.fetch_feed_list().await.len(), 9);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn unparseable_page_is_treated_as_empty() {
    let source = Arc::new(ScriptedSource::new(vec![
        Scripted::Body(clean_page(1, 5)),
        Scripted::Body("<feed><entry><id>1</id></feed>".to_string()),
        Scripted::Fail,
        Scripted::Body(clean_page(4, 1)),
    ]));
    let (pipeline, _) = pipeline_with(source.clone());

    assert_eq!(pipeline.fetch_feed_list().await.len(), 6);
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn total_failure_degrades_to_empty_list() {
    let failing = Arc::new(ScriptedSource::new(
        (0..5).map(|_| Scripted::Fail).collect(),
    ));
    let (pipeline, _) = pipeline_with(failing.clone());
    assert!(pipeline.fetch_feed_list().await.is_empty());
    assert_eq!(failing.calls(), 5);
}

#[tokio::test]
async fn cache_hit_within_ttl_skips_upstream() {
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(clean_page(1, 2))]));
    let (pipeline, clock) = pipeline_with(source.clone());

    let first = pipeline.fetch_feed_list().await;
    clock.advance(Duration::from_secs(3599));
    let second = pipeline.fetch_feed_list().await;

    assert_eq!(first, second);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn cache_expires_after_ttl() {
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(clean_page(1, 2))]));
    let (pipeline, clock) = pipeline_with(source.clone());

    pipeline.fetch_feed_list().await;
    clock.advance(Duration::from_secs(3600));
    pipeline.fetch_feed_list().await;

    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn result_is_stored_under_key_and_tag() {
    init_test_tracing();
    let source = Arc::new(ScriptedSource::new(vec![Scripted::Body(clean_page(1, 1))]));
    let cache = Arc::new(MemoryCache::new(Arc::new(ManualClock::new())));
    let pipeline = FeedPipeline::new(source, cache.clone(), settings());

    let entries = pipeline.fetch_feed_list().await;
    assert_eq!(cache.get("github-feed").await.unwrap(), Some(entries));
    assert_eq!(cache.invalidate_tag("github-feed").await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_misses_share_one_refresh() {
    let source = Arc::new(
        ScriptedSource::new(vec![Scripted::Body(clean_page(1, 3))])
            .with_latency(Duration::from_millis(50)),
    );
    let (pipeline, _) = pipeline_with(source.clone());

    let (a, b, c) = tokio::join!(
        pipeline.fetch_feed_list(),
        pipeline.fetch_feed_list(),
        pipeline.fetch_feed_list()
    );

    assert_eq!(a.len(), 3);
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn waits_between_pages_but_not_before_the_first() {
    init_test_tracing();
    let source = Arc::new(ScriptedSource::new(vec![
        Scripted::Body(clean_page(1, 5)),
        Scripted::Body(clean_page(2, 5)),
        Scripted::Body(clean_page(3, 1)),
    ]));
    let settings = FeedSettings {
        page_delay_ms: 40,
        ..FeedSettings::default()
    };
    let pipeline = FeedPipeline::new(source.clone(), Arc::new(MemoryCache::default()), settings);

    let started = std::time::Instant::now();
    assert_eq!(pipeline.fetch_feed_list().await.len(), 11);
    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(source.calls(), 3);
}
