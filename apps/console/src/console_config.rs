use std::env;
use std::path::PathBuf;
use std::time::Duration;

use kkvat_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_SESSION_FILE: &str = ".kkvat-session.json";

/// Runtime settings read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub download_dir: PathBuf,
    pub http_timeout: Duration,
    pub progress_interval: Duration,
    pub page_size: u32,
}

impl ConsoleConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let api_base_url = lookup("KKVAT_API_BASE_URL")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let session_file = lookup("KKVAT_SESSION_FILE")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_FILE.to_owned());
        let download_dir = lookup("KKVAT_DOWNLOAD_DIR")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| ".".to_owned());

        let http_timeout_secs = parse_positive(&lookup, "KKVAT_HTTP_TIMEOUT_SECS", 30)?;
        let progress_interval_ms = parse_positive(&lookup, "KKVAT_PROGRESS_INTERVAL_MS", 3000)?;
        let page_size = parse_positive(&lookup, "KKVAT_PAGE_SIZE", 20)?;

        Ok(Self {
            api_base_url: normalize_base_url(&api_base_url),
            session_file: PathBuf::from(session_file),
            download_dir: PathBuf::from(download_dir),
            http_timeout: Duration::from_secs(http_timeout_secs),
            progress_interval: Duration::from_millis(progress_interval_ms),
            page_size: u32::try_from(page_size).map_err(|_| {
                AppError::Validation(format!("invalid KKVAT_PAGE_SIZE value '{page_size}'"))
            })?,
        })
    }

    pub fn with_api_base_url(mut self, api_base_url: Option<String>) -> Self {
        if let Some(api_base_url) = api_base_url.filter(|value| !value.trim().is_empty()) {
            self.api_base_url = normalize_base_url(&api_base_url);
        }
        self
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_owned()
}

fn parse_positive(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> AppResult<u64> {
    let Some(value) = lookup(name) else {
        return Ok(default);
    };

    let parsed = value.trim().parse::<u64>().map_err(|error| {
        AppError::Validation(format!("invalid {name} value '{value}': {error}"))
    })?;
    if parsed == 0 {
        return Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        )));
    }

    Ok(parsed)
}
