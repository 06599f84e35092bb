use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::chart::{init_fonts, ChartRenderer, PlottersRenderer};
use crate::config::Settings;
use crate::discussion::{DiscussionPost, DiscussionScraper};
use crate::error::ApiError;
use crate::news::{NewsAggregator, NewsItem};
use crate::price::PriceResolver;
use crate::upstream::Upstream;

/// Label used in chart file names when the caller sends none.
pub const DEFAULT_CHART_NAME: &str = "주식";

/// Shared, immutable handles; every request builds its own result state.
#[derive(Clone)]
pub struct AppState {
    pub price: Arc<PriceResolver>,
    pub news: Arc<NewsAggregator>,
    pub discussion: Arc<DiscussionScraper>,
    pub renderer: Arc<dyn ChartRenderer>,
}

impl AppState {
    /// Wire all components against one upstream client.
    pub fn from_settings(settings: &Settings, upstream: Arc<dyn Upstream>) -> anyhow::Result<Self> {
        init_fonts(settings.chart.font_path.as_deref())?;
        Ok(Self {
            price: Arc::new(PriceResolver::from_settings(upstream.clone(), settings)),
            news: Arc::new(NewsAggregator::from_settings(upstream.clone(), settings)),
            discussion: Arc::new(DiscussionScraper::from_settings(upstream, settings)?),
            renderer: Arc::new(PlottersRenderer::default()),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

pub fn router(state: AppState) -> Router {
    // Reflects the caller's Origin and allows credentials.
    let api = Router::new()
        .route("/stock-chart", post(stock_chart))
        .route("/stock-data", get(stock_data))
        .route("/naver/news", get(naver_news))
        .route("/naver/discussion", get(naver_discussion))
        .layer(CorsLayer::very_permissive());

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ChartReq {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SymbolQuery {
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CodeQuery {
    #[serde(default)]
    code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DatedPrice {
    pub date: String,
    pub price: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StockDataResp {
    pub symbol: String,
    pub data: Vec<DatedPrice>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{field} is required")))
}

/// `attachment` disposition with an ASCII fallback name plus the UTF-8 original.
pub fn attachment_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

pub fn chart_file_name(name: &str, symbol: &str) -> String {
    format!("{}_{}_chart.png", name, symbol.replace('.', "_"))
}

async fn stock_chart(
    State(state): State<AppState>,
    payload: Result<Json<ChartReq>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;
    let symbol = required(req.symbol, "symbol")?;
    let name = req
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CHART_NAME.to_string());

    let series = state
        .price
        .resolve(&symbol)
        .await
        .filter(|s| s.len() >= 2)
        .ok_or_else(|| ApiError::NotFound(format!("no price data for {symbol}")))?;

    let renderer = state.renderer.clone();
    let title = format!("{name} 주가 차트");
    let png = tokio::task::spawn_blocking(move || renderer.render(&series, &title))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let disposition = HeaderValue::from_str(&attachment_disposition(&chart_file_name(
        &name, &symbol,
    )))
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    )
        .into_response())
}

async fn stock_data(
    State(state): State<AppState>,
    query: Result<Query<SymbolQuery>, QueryRejection>,
) -> Result<Json<StockDataResp>, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let symbol = required(q.symbol, "symbol")?;

    let series = state
        .price
        .resolve(&symbol)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("no price data for {symbol}")))?;

    let data = series
        .points
        .iter()
        .map(|p| DatedPrice {
            date: series.date_label(p),
            price: p.price,
        })
        .collect();
    Ok(Json(StockDataResp { symbol, data }))
}

/// Always 200; a missing code or any upstream trouble yields `[]`.
async fn naver_news(
    State(state): State<AppState>,
    query: Result<Query<CodeQuery>, QueryRejection>,
) -> Json<Vec<NewsItem>> {
    let code = query.ok().and_then(|Query(q)| q.code).unwrap_or_default();
    if code.trim().is_empty() {
        return Json(Vec::new());
    }
    Json(state.news.fetch_news(&code).await)
}

async fn naver_discussion(
    State(state): State<AppState>,
    query: Result<Query<CodeQuery>, QueryRejection>,
) -> Result<Json<Vec<DiscussionPost>>, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let code = required(q.code, "code")?;
    let posts = state
        .discussion
        .fetch_discussion(&code)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(posts))
}
