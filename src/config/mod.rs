// src/config/mod.rs
//! Runtime settings: upstream endpoints, proxy strategies, timeouts and the listen port.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::price::proxy::ProxyStrategy;

pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";
pub const ENV_PORT: &str = "PORT";

fn default_port() -> u16 {
    5000
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Applied to every upstream call (price, news and discussion).
    #[serde(default = "default_timeout_secs")]
    pub upstream_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub price: PriceSettings,
    #[serde(default)]
    pub news: NewsSettings,
    #[serde(default)]
    pub discussion: DiscussionSettings,
    #[serde(default)]
    pub chart: ChartSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceSettings {
    pub provider_base: String,
    /// Tried in order until one yields data.
    pub proxies: Vec<ProxyStrategy>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    pub api_base: String,
    pub article_host: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscussionSettings {
    pub origin: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    /// TTF/OTF used for chart text instead of the bundled Latin-only font.
    /// Point this at a Hangul-capable font to render Korean names.
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream_timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            price: PriceSettings::default(),
            news: NewsSettings::default(),
            discussion: DiscussionSettings::default(),
            chart: ChartSettings::default(),
        }
    }
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            provider_base: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            proxies: ProxyStrategy::defaults(),
        }
    }
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            api_base: "https://m.stock.naver.com/api/news/stock".to_string(),
            article_host: "n.news.naver.com".to_string(),
        }
    }
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            origin: "https://m.stock.naver.com".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit TOML file. Missing sections fall back to defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let cfg: Settings = toml::from_str(&content)
            .with_context(|| format!("parsing settings in {}", path.display()))?;
        cfg.validated()
    }

    /// Resolve settings using env var + fallbacks:
    /// 1) $DASHBOARD_CONFIG_PATH
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    ///
    /// `$PORT` overrides the port in every case.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                Self::default()
            }
        };

        if let Ok(port) = std::env::var(ENV_PORT) {
            cfg.port = port
                .trim()
                .parse()
                .with_context(|| format!("{ENV_PORT} must be a valid port, got '{port}'"))?;
        }
        Ok(cfg)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    fn validated(mut self) -> Result<Self> {
        if self.upstream_timeout_secs == 0 {
            self.upstream_timeout_secs = default_timeout_secs();
        }
        if self.price.proxies.is_empty() {
            anyhow::bail!("price.proxies must list at least one proxy strategy");
        }
        Ok(self)
    }
}
