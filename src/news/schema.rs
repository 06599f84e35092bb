// src/news/schema.rs
//! News listing contract: `[ { "total": N, "items": [ {...}, ... ] } ]`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ParseError;

#[derive(Debug, Deserialize)]
pub struct NewsPage {
    #[serde(default)]
    pub items: Option<Vec<RawNewsItem>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNewsItem {
    #[serde(default, deserialize_with = "de_opt_id")]
    pub office_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub article_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub office_name: Option<String>,
    #[serde(default)]
    pub datetime: Option<String>,
}

/// Ids arrive as strings (`"001"`) or bare numbers; empty strings count as absent.
pub fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<Value> = Option::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Decode one listing page into its items. An empty outer array or a missing
/// `items` field is a shape error; an empty `items` array is not.
pub fn decode_page(body: &str) -> Result<Vec<RawNewsItem>, ParseError> {
    let pages: Vec<NewsPage> = serde_json::from_str(body)?;
    let first = pages
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::Shape("empty outer array".into()))?;
    first
        .items
        .ok_or_else(|| ParseError::Shape("missing `items`".into()))
}
