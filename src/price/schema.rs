// src/price/schema.rs
//! Chart provider response contract.
//!
//! ```json
//! { "chart": { "result": [ {
//!     "meta": { "gmtoffset": 32400 },
//!     "timestamp": [1700000000, ...],
//!     "indicators": { "quote": [ { "close": [71200.0, null, ...] } ] }
//! } ], "error": null } }
//! ```

use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: Option<ChartMeta>,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartMeta {
    #[serde(default)]
    pub gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    pub quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

/// Flattened view of the first result: parallel timestamp/close arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseSeries {
    pub timestamps: Vec<i64>,
    pub closes: Vec<Option<f64>>,
    pub gmtoffset: i32,
}

/// Decode a provider payload, failing on any shape mismatch.
pub fn decode_closes(payload: Value) -> Result<CloseSeries, ParseError> {
    let env: ChartEnvelope = serde_json::from_value(payload)?;
    let first = env
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| ParseError::Shape("chart.result is empty".into()))?;
    let quote = first
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::Shape("indicators.quote is empty".into()))?;

    if quote.close.len() < first.timestamp.len() {
        return Err(ParseError::Shape(format!(
            "{} closes for {} timestamps",
            quote.close.len(),
            first.timestamp.len()
        )));
    }

    Ok(CloseSeries {
        timestamps: first.timestamp,
        closes: quote.close,
        gmtoffset: first.meta.and_then(|m| m.gmtoffset).unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_parallel_arrays_and_offset() {
        let v = json!({"chart": {"result": [{
            "meta": {"gmtoffset": 32400, "currency": "KRW"},
            "timestamp": [1, 2],
            "indicators": {"quote": [{"close": [1.5, null], "open": [1.0, 1.0]}]}
        }], "error": null}});
        let cs = decode_closes(v).unwrap();
        assert_eq!(cs.timestamps, vec![1, 2]);
        assert_eq!(cs.closes, vec![Some(1.5), None]);
        assert_eq!(cs.gmtoffset, 32400);
    }

    #[test]
    fn null_result_is_shape_error() {
        let v = json!({"chart": {"result": null, "error": {"code": "Not Found"}}});
        assert!(matches!(decode_closes(v), Err(ParseError::Shape(_))));
    }

    #[test]
    fn missing_chart_is_json_error() {
        let v = json!({"contents": null});
        assert!(matches!(decode_closes(v), Err(ParseError::Json(_))));
    }

    #[test]
    fn short_close_array_is_rejected() {
        let v = json!({"chart": {"result": [{
            "timestamp": [1, 2, 3],
            "indicators": {"quote": [{"close": [1.0]}]}
        }]}});
        assert!(matches!(decode_closes(v), Err(ParseError::Shape(_))));
    }
}
