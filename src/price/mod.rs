// src/price/mod.rs
//! Price-series resolution through an ordered list of CORS relay strategies.
//!
//! Each strategy is tried in turn; the first one that yields at least one
//! usable point wins. Transport errors, bad envelopes and malformed provider
//! payloads all just advance to the next strategy. Nothing is cached.

pub mod proxy;
pub mod schema;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{FetchError, ParseError};
use crate::upstream::{FetchRequest, Upstream};
use proxy::ProxyStrategy;
use schema::{decode_closes, CloseSeries};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Points in provider order (ascending timestamps), never re-sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub points: Vec<PricePoint>,
    /// Exchange offset from UTC, used to label calendar days.
    pub utc_offset_secs: i32,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| Utc.fix())
    }

    /// `YYYY-MM-DD` of a point in the exchange's local day.
    pub fn date_label(&self, point: &PricePoint) -> String {
        point
            .timestamp
            .with_timezone(&self.offset())
            .format("%Y-%m-%d")
            .to_string()
    }

    pub fn first_price(&self) -> Option<f64> {
        self.points.first().map(|p| p.price)
    }

    pub fn last_price(&self) -> Option<f64> {
        self.points.last().map(|p| p.price)
    }
}

/// Outcome of one strategy; only logged and used to pick the next step.
#[derive(Debug)]
pub struct UpstreamAttempt {
    pub strategy_id: String,
    pub outcome: Result<PriceSeries, AttemptFailure>,
}

#[derive(Debug, thiserror::Error)]
pub enum AttemptFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("no non-null closes")]
    Empty,
}

impl AttemptFailure {
    fn kind(&self) -> &'static str {
        match self {
            AttemptFailure::Fetch(e) => e.kind(),
            AttemptFailure::Parse(_) => "parse",
            AttemptFailure::Empty => "empty",
        }
    }
}

/// Keep only positions with a non-null close.
pub fn zip_closes(cs: &CloseSeries) -> Vec<PricePoint> {
    cs.timestamps
        .iter()
        .zip(cs.closes.iter())
        .filter_map(|(ts, close)| {
            let price = (*close)?;
            let timestamp = DateTime::<Utc>::from_timestamp(*ts, 0)?;
            Some(PricePoint { timestamp, price })
        })
        .collect()
}

pub struct PriceResolver {
    upstream: Arc<dyn Upstream>,
    provider_base: String,
    strategies: Vec<ProxyStrategy>,
    timeout: Duration,
    user_agent: String,
}

impl PriceResolver {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        provider_base: impl Into<String>,
        strategies: Vec<ProxyStrategy>,
        timeout: Duration,
    ) -> Self {
        Self {
            upstream,
            provider_base: provider_base.into(),
            strategies,
            timeout,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }

    pub fn from_settings(upstream: Arc<dyn Upstream>, settings: &Settings) -> Self {
        Self::new(
            upstream,
            settings.price.provider_base.clone(),
            settings.price.proxies.clone(),
            settings.upstream_timeout(),
        )
        .with_user_agent(&settings.user_agent)
    }

    pub fn with_user_agent(mut self, ua: &str) -> Self {
        self.user_agent = ua.to_string();
        self
    }

    pub fn strategies(&self) -> &[ProxyStrategy] {
        &self.strategies
    }

    /// Daily closes over the trailing month.
    pub fn provider_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}?interval=1d&range=1mo",
            self.provider_base.trim_end_matches('/'),
            urlencoding::encode(symbol)
        )
    }

    /// Try every strategy in order; `None` when all of them fail.
    pub async fn resolve(&self, symbol: &str) -> Option<PriceSeries> {
        let target = self.provider_url(symbol);
        for strategy in &self.strategies {
            let attempt = self.attempt(strategy, &target).await;
            match attempt.outcome {
                Ok(series) => {
                    tracing::info!(
                        %symbol,
                        proxy = %attempt.strategy_id,
                        points = series.len(),
                        "price series resolved"
                    );
                    return Some(series);
                }
                Err(e) => {
                    counter!("price_proxy_failures_total", "proxy" => attempt.strategy_id.clone(), "kind" => e.kind())
                        .increment(1);
                    tracing::warn!(
                        %symbol,
                        proxy = %attempt.strategy_id,
                        error = %e,
                        "proxy attempt failed, trying next"
                    );
                }
            }
        }
        tracing::warn!(%symbol, tried = self.strategies.len(), "all price proxies exhausted");
        None
    }

    async fn attempt(&self, strategy: &ProxyStrategy, target: &str) -> UpstreamAttempt {
        let outcome = self.try_strategy(strategy, target).await;
        UpstreamAttempt {
            strategy_id: strategy.id.clone(),
            outcome,
        }
    }

    async fn try_strategy(
        &self,
        strategy: &ProxyStrategy,
        target: &str,
    ) -> Result<PriceSeries, AttemptFailure> {
        let req = FetchRequest::new(strategy.wrap_url(target), self.timeout).json(&self.user_agent);
        let body = self.upstream.fetch(&req).await?;
        let payload = strategy.unwrap_body(&body)?;
        let closes = decode_closes(payload)?;
        let points = zip_closes(&closes);
        if points.is_empty() {
            return Err(AttemptFailure::Empty);
        }
        Ok(PriceSeries {
            points,
            utc_offset_secs: closes.gmtoffset,
        })
    }
}
