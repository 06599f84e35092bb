// src/news/mod.rs
//! News aggregation: walk the paginated listing, dedup by `(officeId, articleId)`,
//! normalize, then return the five most recent items.
//!
//! Every failure (transport, bad JSON, unexpected shape) ends pagination early
//! and the items gathered so far are returned. Nothing escapes as an error.

pub mod schema;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::UpstreamError;
use crate::upstream::{FetchRequest, Upstream};
use schema::{decode_page, RawNewsItem};

pub const MAX_ITEMS: usize = 5;
pub const MAX_PAGES: u32 = 5;
pub const SUMMARY_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: Option<String>,
    pub summary: String,
    pub url: Option<String>,
    pub press: Option<String>,
    /// Opaque `YYYYMMDDHHmm` token as sent upstream.
    pub date: Option<String>,
}

/// Identity of an article across pages.
pub type ArticleKey = (Option<String>, String);

/// Drop `.KS` / `.KQ` exchange suffixes; the listing API keys on the bare code.
pub fn strip_exchange_suffix(code: &str) -> &str {
    let code = code.trim();
    code.strip_suffix(".KS")
        .or_else(|| code.strip_suffix(".KQ"))
        .unwrap_or(code)
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub struct NewsAggregator {
    upstream: Arc<dyn Upstream>,
    api_base: String,
    article_host: String,
    timeout: Duration,
    user_agent: String,
}

impl NewsAggregator {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        api_base: impl Into<String>,
        article_host: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            api_base: api_base.into(),
            article_host: article_host.into(),
            timeout,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }

    pub fn from_settings(upstream: Arc<dyn Upstream>, settings: &Settings) -> Self {
        let mut agg = Self::new(
            upstream,
            settings.news.api_base.clone(),
            settings.news.article_host.clone(),
            settings.upstream_timeout(),
        );
        agg.user_agent = settings.user_agent.clone();
        agg
    }

    /// Page 1 is the bare endpoint; later pages add `?page=N`. The code is
    /// sent as a single percent-encoded path segment.
    pub fn page_url(&self, code: &str, page: u32) -> String {
        let base = format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(code)
        );
        if page <= 1 {
            base
        } else {
            format!("{base}?page={page}")
        }
    }

    pub fn article_url(&self, office_id: &str, article_id: &str) -> String {
        format!("https://{}/article/{}/{}", self.article_host, office_id, article_id)
    }

    /// Up to five deduplicated items, most recent first.
    pub async fn fetch_news(&self, stock_code: &str) -> Vec<NewsItem> {
        let code = strip_exchange_suffix(stock_code);
        if code.is_empty() {
            return Vec::new();
        }

        let mut seen: HashSet<ArticleKey> = HashSet::new();
        let mut collected: Vec<NewsItem> = Vec::with_capacity(MAX_ITEMS);

        for page in 1..=MAX_PAGES {
            let items = match self.fetch_page(code, page).await {
                Ok(items) if items.is_empty() => {
                    tracing::debug!(%code, page, "empty news page, end of data");
                    break;
                }
                Ok(items) => items,
                Err(e) => {
                    counter!("news_page_errors_total").increment(1);
                    tracing::warn!(%code, page, error = %e, "news page failed, keeping partial result");
                    break;
                }
            };

            for raw in items {
                if collected.len() >= MAX_ITEMS {
                    break;
                }
                let Some(article_id) = raw.article_id.clone() else {
                    continue;
                };
                if !seen.insert((raw.office_id.clone(), article_id)) {
                    continue;
                }
                collected.push(self.normalize(raw));
            }

            if collected.len() >= MAX_ITEMS {
                break;
            }
        }

        counter!("news_items_collected_total").increment(collected.len() as u64);
        let out = finalize(collected);
        tracing::info!(%code, items = out.len(), "news aggregated");
        out
    }

    async fn fetch_page(&self, code: &str, page: u32) -> Result<Vec<RawNewsItem>, UpstreamError> {
        let req = FetchRequest::new(self.page_url(code, page), self.timeout).json(&self.user_agent);
        let body = self.upstream.fetch(&req).await?;
        Ok(decode_page(&body)?)
    }

    fn normalize(&self, raw: RawNewsItem) -> NewsItem {
        let url = match (raw.office_id.as_deref(), raw.article_id.as_deref()) {
            (Some(office), Some(article)) => Some(self.article_url(office, article)),
            _ => None,
        };
        NewsItem {
            title: raw.title,
            summary: truncate_chars(raw.body.as_deref().unwrap_or_default(), SUMMARY_CHARS),
            url,
            press: raw.office_name,
            date: raw.datetime,
        }
    }
}

/// Sort by date token descending (absent dates last), keep the first five.
pub fn finalize(mut items: Vec<NewsItem>) -> Vec<NewsItem> {
    items.sort_by(|a, b| {
        let da = a.date.as_deref().unwrap_or_default();
        let db = b.date.as_deref().unwrap_or_default();
        db.cmp(da)
    });
    items.truncate(MAX_ITEMS);
    items
}
