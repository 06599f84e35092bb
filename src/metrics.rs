use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

fn describe() {
    describe_counter!("upstream_requests_total", "Upstream HTTP requests issued.");
    describe_counter!(
        "upstream_errors_total",
        "Upstream requests that failed, by error kind."
    );
    describe_histogram!("upstream_fetch_ms", "Upstream request time in milliseconds.");
    describe_counter!(
        "price_proxy_failures_total",
        "Price proxy strategies that failed, by proxy and kind."
    );
    describe_counter!(
        "news_page_errors_total",
        "News pages that ended pagination early."
    );
    describe_counter!(
        "news_items_collected_total",
        "Unique news items collected before sorting."
    );
    describe_counter!("discussion_posts_total", "Discussion posts scraped.");
}

impl Metrics {
    /// Install the Prometheus recorder once per process. Returns `None` when
    /// another recorder was installed first (e.g. by a test harness).
    pub fn init() -> Option<Self> {
        HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    describe();
                    Some(handle)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "prometheus recorder not installed");
                    None
                }
            })
            .clone()
            .map(|handle| Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
