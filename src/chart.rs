// src/chart.rs
//! PNG rendering of a normalized price series.

use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbImage};
use once_cell::sync::OnceCell;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

use crate::price::PriceSeries;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 600;

const RISING: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
const FALLING: RGBColor = RGBColor(0x34, 0x98, 0xdb);
const GRID: RGBColor = RGBColor(0xe6, 0xe6, 0xe6);

/// Family every text element is drawn with; registered by [`init_fonts`].
pub const FONT_FAMILY: &str = "sans-serif";

static BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static FONTS_READY: OnceCell<()> = OnceCell::new();

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("need at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("png encoding failed: {0}")]
    Encode(String),
    #[error("font setup failed: {0}")]
    Font(String),
}

/// Register the chart font once per process. `font_path` replaces the bundled
/// DejaVu Sans, which has no Hangul glyphs. Later calls are no-ops.
pub fn init_fonts(font_path: Option<&Path>) -> Result<(), ChartError> {
    FONTS_READY.get_or_try_init(|| {
        let bytes: &'static [u8] = match font_path {
            Some(p) => {
                let data = std::fs::read(p)
                    .map_err(|e| ChartError::Font(format!("{}: {e}", p.display())))?;
                Box::leak(data.into_boxed_slice())
            }
            None => BUNDLED_FONT,
        };
        register_font(FONT_FAMILY, FontStyle::Normal, bytes)
            .map_err(|_| ChartError::Font("unreadable font data".into()))?;
        tracing::info!(
            font = %font_path.map(|p| p.display().to_string()).unwrap_or_else(|| "bundled".into()),
            "chart font registered"
        );
        Ok(())
    })?;
    Ok(())
}

pub trait ChartRenderer: Send + Sync {
    /// Render `series` to PNG bytes. `title` labels the chart for the caller;
    /// renderers may ignore it.
    fn render(&self, series: &PriceSeries, title: &str) -> Result<Vec<u8>, ChartError>;
}

/// Filled line chart with caption, dated x axis and grid. Red when the period
/// closed at or above its start, blue otherwise.
#[derive(Debug, Clone, Copy)]
pub struct PlottersRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
        }
    }
}

pub fn trend_color(series: &PriceSeries) -> RGBColor {
    match (series.first_price(), series.last_price()) {
        (Some(first), Some(last)) if last < first => FALLING,
        _ => RISING,
    }
}

impl PlottersRenderer {
    fn draw(&self, series: &PriceSeries, title: &str, buf: &mut [u8]) -> Result<(), ChartError> {
        let xs = series.points.iter().map(|p| p.timestamp.timestamp());
        let x_min = xs.clone().min().unwrap_or(0);
        let mut x_max = xs.max().unwrap_or(1);
        if x_max <= x_min {
            x_max = x_min + 1;
        }

        let prices = series.points.iter().map(|p| p.price);
        let lo = prices.clone().fold(f64::INFINITY, f64::min);
        let hi = prices.fold(f64::NEG_INFINITY, f64::max);
        let pad = ((hi - lo) * 0.05).max(hi.abs() * 0.001).max(f64::EPSILON);
        let (y_min, y_max) = (lo - pad, hi + pad);

        let color = trend_color(series);
        let data: Vec<(i64, f64)> = series
            .points
            .iter()
            .map(|p| (p.timestamp.timestamp(), p.price))
            .collect();

        let root = BitMapBackend::with_buffer(buf, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| ChartError::Draw(e.to_string()))?;

        let mut chart = ChartBuilder::on(&root)
            .margin(24)
            .caption(title, (FONT_FAMILY, 28))
            .x_label_area_size(40)
            .y_label_area_size(80)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| ChartError::Draw(e.to_string()))?;

        let offset = series.offset();
        let date_label = |ts: &i64| {
            DateTime::<Utc>::from_timestamp(*ts, 0)
                .map(|d| d.with_timezone(&offset).format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };
        chart
            .configure_mesh()
            .light_line_style(GRID)
            .bold_line_style(GRID)
            .x_labels(6)
            .x_label_formatter(&date_label)
            .y_label_formatter(&|p: &f64| format!("{p:.2}"))
            .x_desc("Date")
            .y_desc("Price")
            .label_style((FONT_FAMILY, 14))
            .draw()
            .map_err(|e| ChartError::Draw(e.to_string()))?;

        chart
            .draw_series(AreaSeries::new(data.iter().copied(), y_min, color.mix(0.3)))
            .map_err(|e| ChartError::Draw(e.to_string()))?;
        chart
            .draw_series(LineSeries::new(data.iter().copied(), color.stroke_width(3)))
            .map_err(|e| ChartError::Draw(e.to_string()))?;

        root.present().map_err(|e| ChartError::Draw(e.to_string()))?;
        Ok(())
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, series: &PriceSeries, title: &str) -> Result<Vec<u8>, ChartError> {
        if series.len() < 2 {
            return Err(ChartError::TooFewPoints(series.len()));
        }
        init_fonts(None)?;

        let mut buf = vec![0u8; (self.width * self.height * 3) as usize];
        self.draw(series, title, &mut buf)?;

        let img = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| ChartError::Encode("buffer size mismatch".into()))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| ChartError::Encode(e.to_string()))?;

        tracing::debug!(%title, points = series.len(), bytes = out.get_ref().len(), "chart rendered");
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::price::PricePoint;
    use chrono::{DateTime, Utc};

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries {
            points: prices
                .iter()
                .enumerate()
                .map(|(i, p)| PricePoint {
                    timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000 + i as i64 * 86_400, 0)
                        .unwrap(),
                    price: *p,
                })
                .collect(),
            utc_offset_secs: 0,
        }
    }

    #[test]
    fn color_follows_trend() {
        assert_eq!(trend_color(&series(&[1.0, 2.0])).rgb(), RISING.rgb());
        assert_eq!(trend_color(&series(&[2.0, 2.0])).rgb(), RISING.rgb());
        assert_eq!(trend_color(&series(&[2.0, 1.0])).rgb(), FALLING.rgb());
    }

    #[test]
    fn renders_png_bytes() {
        let r = PlottersRenderer {
            width: 400,
            height: 240,
        };
        let png = r.render(&series(&[10.0, 12.0, 11.0]), "t").unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn caption_text_is_drawn() {
        let r = PlottersRenderer {
            width: 400,
            height: 240,
        };
        let s = series(&[10.0, 12.0, 11.0]);
        let a = r.render(&s, "AAPL").unwrap();
        let b = r.render(&s, "MSFT").unwrap();
        assert_ne!(a, b);
        assert_eq!(a, r.render(&s, "AAPL").unwrap());
    }

    #[test]
    fn init_fonts_is_idempotent() {
        init_fonts(None).unwrap();
        init_fonts(None).unwrap();
    }

    #[test]
    fn rejects_single_point() {
        let err = PlottersRenderer::default()
            .render(&series(&[10.0]), "t")
            .unwrap_err();
        assert!(matches!(err, ChartError::TooFewPoints(1)));
    }

    #[test]
    fn flat_series_still_renders() {
        let r = PlottersRenderer {
            width: 400,
            height: 240,
        };
        assert!(r.render(&series(&[5.0, 5.0, 5.0]), "flat").is_ok());
    }
}
