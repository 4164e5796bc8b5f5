pub mod dto;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use tracing::{info, warn};
use url::Url;

use crate::config::SourceConfig;
use crate::error::{AppError, FetchError};

pub use dto::RawSnapshot;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Script reference to the exported data file, e.g. `src="js/nika_data_123.js"`.
const ASSET_PATTERN: &str = r#"src="([^"]*nika_data[^"]*\.js)""#;
const TRAILING_COMMA_PATTERN: &str = r",\s*([}\]])";

#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch(&self) -> Result<RawSnapshot, FetchError>;
}

pub struct HttpScheduleSource {
    config: SourceConfig,
    asset_pattern: Regex,
    trailing_comma: Regex,
}

impl HttpScheduleSource {
    pub fn new(config: SourceConfig) -> Result<Self, AppError> {
        let asset_pattern = Regex::new(ASSET_PATTERN)
            .map_err(|e| AppError::Config(format!("Invalid asset pattern: {}", e)))?;
        let trailing_comma = Regex::new(TRAILING_COMMA_PATTERN)
            .map_err(|e| AppError::Config(format!("Invalid repair pattern: {}", e)))?;
        Ok(Self {
            config,
            asset_pattern,
            trailing_comma,
        })
    }

    /// A fresh client per fetch; dropping it closes the pooled connections.
    fn build_client(&self) -> Result<Client, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(self.config.fetch_timeout)
            .build()?;
        Ok(client)
    }

    async fn get_text(client: &Client, url: &Url) -> Result<String, FetchError> {
        let response = client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn fetch(&self) -> Result<RawSnapshot, FetchError> {
        let client = self.build_client()?;

        info!("Fetching {}", self.config.schedule_url);
        let html = Self::get_text(&client, &self.config.schedule_url).await?;

        let reference = find_asset_reference(&self.asset_pattern, &html).ok_or_else(|| {
            let snippet: String = html.chars().take(200).collect();
            FetchError::AssetNotFound(format!(
                "no data script referenced by {} (page starts with {:?})",
                self.config.schedule_url, snippet
            ))
        })?;

        let asset_url =
            resolve_asset_url(&self.config.schedule_url, &self.config.base_url, reference)?;
        info!("Found data file: {}", asset_url);

        let script = Self::get_text(&client, &asset_url).await?;
        extract_payload(&script, &self.trailing_comma)
    }
}

pub fn find_asset_reference<'a>(pattern: &Regex, html: &'a str) -> Option<&'a str> {
    pattern
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Root-relative references hang off the site root of the page; anything else
/// is joined onto the configured base path.
pub fn resolve_asset_url(page: &Url, base: &Url, reference: &str) -> Result<Url, FetchError> {
    let joined = if reference.starts_with('/') && !reference.starts_with("//") {
        page.join(reference)
    } else {
        base.join(reference)
    };
    joined.map_err(|e| FetchError::AssetNotFound(format!("cannot resolve {:?}: {}", reference, e)))
}

/// Cuts the object literal out of a script body and decodes it, with one
/// trailing-comma repair attempt.
pub fn extract_payload(script: &str, trailing_comma: &Regex) -> Result<RawSnapshot, FetchError> {
    let start = script.find('{');
    let end = script.rfind('}');
    let literal = match (start, end) {
        (Some(start), Some(end)) if start < end => &script[start..=end],
        _ => {
            return Err(FetchError::MalformedPayload(
                "no object literal found in data file".to_string(),
            ));
        }
    };

    let value = match serde_json::from_str::<serde_json::Value>(literal) {
        Ok(value) => value,
        Err(e) => {
            warn!("Standard JSON decode failed: {}. Attempting cleanup.", e);
            let repaired = trailing_comma.replace_all(literal, "$1");
            serde_json::from_str(&repaired)
                .map_err(|e| FetchError::MalformedPayload(e.to_string()))?
        }
    };

    RawSnapshot::from_value(value)
        .ok_or_else(|| FetchError::MalformedPayload("payload is not an object".to_string()))
}
