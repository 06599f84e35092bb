// src/upstream.rs
//! Upstream client: one HTTP GET with a mandatory timeout and identifying headers.
//! No retries here; fallback and pagination policies live in the callers.

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::error::FetchError;

/// A single upstream GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Headers every JSON caller sends.
    pub fn json(self, user_agent: &str) -> Self {
        self.header("User-Agent", user_agent)
            .header("Accept", "application/json")
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch `req.url` and return the body as text.
    async fn fetch(&self, req: &FetchRequest) -> Result<String, FetchError>;
}

/// reqwest-backed upstream sharing one connection pool.
#[derive(Clone, Default)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = e.status() {
        FetchError::Http(status.as_u16())
    } else if e.is_decode() || e.is_body() {
        FetchError::BodyDecode(e.to_string())
    } else {
        FetchError::Connection(e.to_string())
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, req: &FetchRequest) -> Result<String, FetchError> {
        let t0 = Instant::now();
        counter!("upstream_requests_total").increment(1);

        let mut builder = self.client.get(&req.url).timeout(req.timeout);
        for (name, value) in &req.headers {
            builder = builder.header(*name, value.as_str());
        }

        let result = async {
            let resp = builder.send().await.map_err(classify)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Http(status.as_u16()));
            }
            resp.text().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::BodyDecode(e.to_string())
                }
            })
        }
        .await;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("upstream_fetch_ms").record(ms);

        match &result {
            Ok(body) => {
                tracing::debug!(url = %req.url, bytes = body.len(), ms, "upstream fetch ok");
            }
            Err(e) => {
                counter!("upstream_errors_total", "kind" => e.kind()).increment(1);
                tracing::debug!(url = %req.url, error = %e, ms, "upstream fetch failed");
            }
        }
        result
    }
}
