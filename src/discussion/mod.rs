// src/discussion/mod.rs
pub mod parser;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::Settings;
use crate::error::FetchError;
use crate::upstream::{FetchRequest, Upstream};
use parser::{PostFields, PostParser, SelectorParser};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionPost {
    pub title: String,
    pub info: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum DiscussionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("discussion item #{index} has no {part} element")]
    MissingElement { index: usize, part: &'static str },
    #[error("invalid selector {0}")]
    Selector(String),
}

/// Fetches a stock's discussion page and turns its list items into posts,
/// in document order. Errors are not absorbed.
pub struct DiscussionScraper {
    upstream: Arc<dyn Upstream>,
    parser: Arc<dyn PostParser>,
    origin: String,
    timeout: Duration,
    user_agent: String,
}

impl DiscussionScraper {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        parser: Arc<dyn PostParser>,
        origin: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            parser,
            origin: origin.into().trim_end_matches('/').to_string(),
            timeout,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }

    pub fn from_settings(
        upstream: Arc<dyn Upstream>,
        settings: &Settings,
    ) -> Result<Self, DiscussionError> {
        let mut s = Self::new(
            upstream,
            Arc::new(SelectorParser::new()?),
            settings.discussion.origin.clone(),
            settings.upstream_timeout(),
        );
        s.user_agent = settings.user_agent.clone();
        Ok(s)
    }

    pub fn page_url(&self, code: &str) -> String {
        format!(
            "{}/domestic/stock/{}/discussion",
            self.origin,
            urlencoding::encode(code)
        )
    }

    /// Relative hrefs get the mobile-site origin; absolute ones pass through.
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.origin, href)
        }
    }

    pub async fn fetch_discussion(
        &self,
        stock_code: &str,
    ) -> Result<Vec<DiscussionPost>, DiscussionError> {
        let req = FetchRequest::new(self.page_url(stock_code), self.timeout)
            .header("User-Agent", self.user_agent.as_str());
        let html = self.upstream.fetch(&req).await?;
        let fields = self.parser.parse(&html)?;

        let posts: Vec<DiscussionPost> = fields
            .into_iter()
            .map(|PostFields { title, href, info }| DiscussionPost {
                url: self.absolute_url(&href),
                title,
                info,
            })
            .collect();

        counter!("discussion_posts_total").increment(posts.len() as u64);
        tracing::info!(code = %stock_code, posts = posts.len(), "discussion scraped");
        Ok(posts)
    }
}
