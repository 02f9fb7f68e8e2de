use std::path::PathBuf;

use anyhow::Context;

use crate::query::truncate::{SeriesCaps, DEFAULT_MAX_DATA_POINTS, DEFAULT_MAX_SERIES};
use crate::query::window::{WindowPolicy, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::tools::ToolSettings;

pub const DEFAULT_SITE: &str = "datadoghq.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend credentials. Reported on startup, never sent anywhere by this crate.
    pub api_key: Option<String>,
    pub app_key: Option<String>,
    /// Backend site, e.g. `datadoghq.eu`. Set via DD_SITE. Default: datadoghq.com.
    pub site: String,
    /// JSON snapshot served by the offline backend. Set via OBSQ_SNAPSHOT.
    pub snapshot: Option<PathBuf>,
    pub max_series: usize,
    pub max_data_points: usize,
    /// Default page size for offset-paged listings, capped at 1000.
    pub default_page_size: usize,
    pub log_format: LogFormat,
}

impl Config {
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.app_key.is_some()
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            series_caps: SeriesCaps {
                max_series: self.max_series,
                max_points: self.max_data_points,
            },
            page: WindowPolicy::new(self.default_page_size, MAX_PAGE_SIZE),
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary variable source. Empty values count as unset.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let positive = |key: &str, default: usize| -> anyhow::Result<usize> {
        match var(key) {
            None => Ok(default),
            Some(raw) => {
                let n: usize = raw
                    .parse()
                    .with_context(|| format!("{} must be a positive integer, got '{}'", key, raw))?;
                if n == 0 {
                    anyhow::bail!("{} must be greater than zero", key);
                }
                Ok(n)
            }
        }
    };

    let log_format = match var("OBSQ_LOG_FORMAT").as_deref() {
        None | Some("text") | Some("pretty") => LogFormat::Text,
        Some("json") => LogFormat::Json,
        Some(other) => anyhow::bail!("OBSQ_LOG_FORMAT must be 'text' or 'json', got '{}'", other),
    };

    Ok(Config {
        api_key: var("DD_API_KEY"),
        app_key: var("DD_APP_KEY"),
        site: var("DD_SITE").unwrap_or_else(|| DEFAULT_SITE.into()),
        snapshot: var("OBSQ_SNAPSHOT").map(PathBuf::from),
        max_series: positive("OBSQ_MAX_SERIES", DEFAULT_MAX_SERIES)?,
        max_data_points: positive("OBSQ_MAX_DATA_POINTS", DEFAULT_MAX_DATA_POINTS)?,
        default_page_size: positive("OBSQ_DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?.min(MAX_PAGE_SIZE),
        log_format,
    })
}
