//! Where Atom pages come from.

use crate::FeedError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sitefeed_config::FeedSettings;
use sitefeed_http::{Auth, HttpClient, RequestOpts};
use std::borrow::Cow;

const API_VERSION_HEADER: &str = "x-github-api-version";

/// A paginated Atom feed. Pages are numbered from 1.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Raw XML body of `page`.
    async fn fetch_page(&self, page: u32) -> Result<String, FeedError>;
}

/// `GET {origin}/{user}.atom?page={n}` against GitHub.
// No Debug: it would print the access token.
#[derive(Clone)]
pub struct GithubFeedSource {
    client: HttpClient,
    path: String,
    api_version: HeaderValue,
    access_token: Option<String>,
}

impl GithubFeedSource {
    /// Build a source from feed settings. Without an access token requests go
    /// out unauthenticated and are subject to the anonymous rate limit.
    pub fn new(settings: &FeedSettings) -> Result<Self, FeedError> {
        let client = HttpClient::new(&settings.origin)?
            .with_timeout(settings.request_timeout())
            .with_retries(settings.request_retries);
        let api_version = HeaderValue::from_str(&settings.api_version)
            .map_err(|e| FeedError::Config(format!("api_version: {e}")))?;

        if settings.access_token.is_none() {
            tracing::info!(user = %settings.user, "feed.source.unauthenticated");
        }

        Ok(Self {
            client,
            path: format!("{}.atom", settings.user),
            api_version,
            access_token: settings.access_token.clone(),
        })
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }
}

#[async_trait]
impl FeedSource for GithubFeedSource {
    async fn fetch_page(&self, page: u32) -> Result<String, FeedError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            self.api_version.clone(),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            HeaderValue::from_static("application/atom+xml"),
        );

        let opts = RequestOpts {
            auth: self.access_token.as_deref().map(Auth::Bearer),
            headers: Some(headers),
            query: Some(vec![("page", Cow::Owned(page.to_string()))]),
            ..Default::default()
        };

        let body = self.client.get_text(&self.path, opts).await?;
        tracing::debug!(page, bytes = body.len(), "feed.page.fetched");
        Ok(body)
    }
}
