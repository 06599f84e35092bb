// tests/price_resolver.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use stock_dashboard::error::FetchError;
use stock_dashboard::price::PriceResolver;
use stock_dashboard::upstream::Upstream;

fn resolver(fake: &Arc<FakeUpstream>) -> PriceResolver {
    let upstream: Arc<dyn Upstream> = fake.clone();
    PriceResolver::new(upstream, PROVIDER, test_proxies(), Duration::from_secs(10))
}

#[tokio::test]
async fn null_closes_are_dropped() {
    let fake = FakeUpstream::new();
    fake.ok(
        wrapped_url("TEST"),
        enveloped(&chart_json(&[100, 200, 300], &[Some(10.0), None, Some(12.0)])),
    );

    let series = resolver(&fake).resolve("TEST").await.expect("series");
    let got: Vec<(i64, f64)> = series
        .points
        .iter()
        .map(|p| (p.timestamp.timestamp(), p.price))
        .collect();
    assert_eq!(got, vec![(100, 10.0), (300, 12.0)]);
    assert_eq!(fake.calls().len(), 1, "first proxy succeeded, no fallback");
}

#[tokio::test]
async fn falls_back_to_next_proxy_on_fetch_error() {
    let fake = FakeUpstream::new();
    fake.fail(wrapped_url("AAPL"), FetchError::Timeout);
    fake.ok(raw_url("AAPL"), chart_json(&[1, 2], &[Some(1.0), Some(2.0)]));

    let series = resolver(&fake).resolve("AAPL").await.expect("series");
    assert_eq!(series.len(), 2);
    assert_eq!(fake.calls(), vec![wrapped_url("AAPL"), raw_url("AAPL")]);
}

#[tokio::test]
async fn missing_envelope_advances_to_next_proxy() {
    let fake = FakeUpstream::new();
    // Relay answered with the bare payload instead of the declared envelope.
    fake.ok(wrapped_url("AAPL"), chart_json(&[1], &[Some(1.0)]));
    fake.ok(raw_url("AAPL"), chart_json(&[5, 6], &[Some(5.0), Some(6.0)]));

    let series = resolver(&fake).resolve("AAPL").await.expect("series");
    assert_eq!(series.points[0].timestamp.timestamp(), 5);
}

#[tokio::test]
async fn all_null_closes_count_as_failure() {
    let fake = FakeUpstream::new();
    fake.ok(
        wrapped_url("X"),
        enveloped(&chart_json(&[1, 2], &[None, None])),
    );
    fake.ok(raw_url("X"), chart_json(&[3], &[Some(3.0)]));

    let series = resolver(&fake).resolve("X").await.expect("series");
    assert_eq!(series.len(), 1);
    assert_eq!(series.points[0].price, 3.0);
}

#[tokio::test]
async fn malformed_payloads_everywhere_yield_none() {
    let fake = FakeUpstream::new();
    fake.ok(wrapped_url("BAD"), enveloped("not json"));
    fake.ok(
        raw_url("BAD"),
        r#"{"chart":{"result":null,"error":{"code":"Not Found"}}}"#,
    );

    assert!(resolver(&fake).resolve("BAD").await.is_none());
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn every_proxy_failing_yields_none() {
    let fake = FakeUpstream::new();
    fake.fail(wrapped_url("Z"), FetchError::Http(502));
    fake.fail(raw_url("Z"), FetchError::Connection("refused".into()));

    assert!(resolver(&fake).resolve("Z").await.is_none());
}

#[tokio::test]
async fn single_point_is_still_returned() {
    // Minimum-length checks belong to the chart caller.
    let fake = FakeUpstream::new();
    fake.ok(wrapped_url("ONE"), enveloped(&chart_json(&[7], &[Some(7.5)])));

    let series = resolver(&fake).resolve("ONE").await.expect("series");
    assert_eq!(series.len(), 1);
}

#[tokio::test]
async fn order_is_kept_as_delivered() {
    let fake = FakeUpstream::new();
    fake.ok(
        wrapped_url("ORD"),
        enveloped(&chart_json(&[300, 100, 200], &[Some(3.0), Some(1.0), Some(2.0)])),
    );

    let series = resolver(&fake).resolve("ORD").await.expect("series");
    let ts: Vec<i64> = series.points.iter().map(|p| p.timestamp.timestamp()).collect();
    assert_eq!(ts, vec![300, 100, 200]);
}

#[tokio::test]
async fn symbol_is_encoded_before_wrapping() {
    let fake = FakeUpstream::new();
    fake.ok(
        raw_url("A%2FB%3Frange%3D5y"),
        chart_json(&[1, 2], &[Some(1.0), Some(2.0)]),
    );

    let series = resolver(&fake).resolve("A/B?range=5y").await.expect("series");
    assert_eq!(series.len(), 2);
    assert_eq!(fake.calls()[1], raw_url("A%2FB%3Frange%3D5y"));
}
