// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod chart;
pub mod config;
pub mod discussion;
pub mod error;
pub mod metrics;
pub mod news;
pub mod price;
pub mod telemetry;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::Settings;
pub use crate::discussion::{DiscussionPost, DiscussionScraper};
pub use crate::news::{NewsAggregator, NewsItem};
pub use crate::price::{PricePoint, PriceResolver, PriceSeries};
pub use crate::upstream::{FetchRequest, HttpUpstream, Upstream};

use std::sync::Arc;

/// Build the full application router (API + `/metrics` when a recorder could
/// be installed) from settings, using the real HTTP upstream.
pub fn app(settings: &Settings) -> anyhow::Result<axum::Router> {
    let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::new());
    let state = AppState::from_settings(settings, upstream)?;
    let mut app = router(state);
    if let Some(m) = crate::metrics::Metrics::init() {
        app = app.merge(m.router());
    }
    Ok(app)
}
