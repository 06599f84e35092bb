// tests/common/mod.rs
//
// In-memory upstream used by the integration tests: URL -> canned response,
// with every requested URL recorded in order.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stock_dashboard::error::FetchError;
use stock_dashboard::price::proxy::{ProxyStrategy, UrlWrap};
use stock_dashboard::upstream::{FetchRequest, Upstream};
use stock_dashboard::Settings;

#[derive(Default)]
pub struct FakeUpstream {
    routes: Mutex<HashMap<String, Result<String, FetchError>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ok(&self, url: impl Into<String>, body: impl Into<String>) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.into(), Ok(body.into()));
    }

    pub fn fail(&self, url: impl Into<String>, err: FetchError) {
        self.routes.lock().unwrap().insert(url.into(), Err(err));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for FakeUpstream {
    async fn fetch(&self, req: &FetchRequest) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(req.url.clone());
        self.routes
            .lock()
            .unwrap()
            .get(&req.url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Connection(format!("no route for {}", req.url))))
    }
}

pub const PROVIDER: &str = "http://provider/chart";
pub const NEWS_API: &str = "http://news/api/news/stock";
pub const ORIGIN: &str = "http://m.stock";

/// Two fake relays: an enveloping one first, then a raw pass-through.
pub fn test_proxies() -> Vec<ProxyStrategy> {
    vec![
        ProxyStrategy::new("wrapped", "http://relay-a/get?url=", UrlWrap::Encoded)
            .with_envelope("contents"),
        ProxyStrategy::new("raw", "http://relay-b/?", UrlWrap::Raw),
    ]
}

pub fn test_settings() -> Settings {
    let mut s = Settings::default();
    s.price.provider_base = PROVIDER.to_string();
    s.price.proxies = test_proxies();
    s.news.api_base = NEWS_API.to_string();
    s.news.article_host = "n.news.test".to_string();
    s.discussion.origin = ORIGIN.to_string();
    s
}

pub fn target_url(symbol: &str) -> String {
    format!("{PROVIDER}/{symbol}?interval=1d&range=1mo")
}

pub fn wrapped_url(symbol: &str) -> String {
    format!(
        "http://relay-a/get?url={}",
        urlencoding::encode(&target_url(symbol))
    )
}

pub fn raw_url(symbol: &str) -> String {
    format!("http://relay-b/?{}", target_url(symbol))
}

/// Provider chart payload with the given parallel arrays.
pub fn chart_json(timestamps: &[i64], closes: &[Option<f64>]) -> String {
    serde_json::json!({
        "chart": {
            "result": [{
                "meta": { "gmtoffset": 0 },
                "timestamp": timestamps,
                "indicators": { "quote": [{ "close": closes }] }
            }],
            "error": null
        }
    })
    .to_string()
}

/// Wrap a provider payload the way an enveloping relay does.
pub fn enveloped(inner: &str) -> String {
    serde_json::json!({ "contents": inner, "status": { "http_code": 200 } }).to_string()
}

/// One news listing page.
pub fn news_page(items: serde_json::Value) -> String {
    serde_json::json!([{ "total": 100, "items": items }]).to_string()
}

pub fn news_item(office: &str, article: &str, datetime: &str) -> serde_json::Value {
    serde_json::json!({
        "officeId": office,
        "articleId": article,
        "officeName": format!("press-{office}"),
        "title": format!("title {office}/{article}"),
        "body": format!("body of {article}"),
        "datetime": datetime
    })
}
