//! Settings structures for hotel-search-rs configuration

use crate::error::SearchError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main settings structure, mirrors `settings.yml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub retry: RetrySettings,
    pub scroll: ScrollSettings,
    pub highlight: HighlightSettings,
    pub search: SearchSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (HOTEL_SEARCH_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("HOTEL_SEARCH_URL") {
            self.connection.url = val;
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_INDEX") {
            self.connection.index = val;
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_USERNAME") {
            self.connection.username = Some(val);
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_PASSWORD") {
            self.connection.password = Some(val);
        }
        if let Ok(val) = std::env::var("HOTEL_SEARCH_TIMEOUT") {
            if let Ok(timeout) = val.parse() {
                self.connection.request_timeout = timeout;
            }
        }
    }

    /// Reject settings a client could not work with
    pub fn validate(&self) -> std::result::Result<(), SearchError> {
        url::Url::parse(&self.connection.url).map_err(|e| {
            SearchError::Config(format!("invalid url '{}': {}", self.connection.url, e))
        })?;
        if self.connection.index.trim().is_empty() {
            return Err(SearchError::Config("index name must not be empty".into()));
        }
        self.connection.timeout()?;
        if self.scroll.keep_alive_secs == 0 {
            return Err(SearchError::Config(
                "scroll.keep_alive_secs must be greater than zero".into(),
            ));
        }
        if self.scroll.page_size == 0 || self.search.default_page_size == 0 {
            return Err(SearchError::Config("page sizes must be at least 1".into()));
        }
        if self.retry.backoff_multiplier < 1.0 || !(0.0..=1.0).contains(&self.retry.jitter_factor)
        {
            return Err(SearchError::Config(
                "retry.backoff_multiplier must be >= 1 and jitter_factor within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Where and how to reach the search engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Base URL of the engine
    pub url: String,
    /// Index holding hotel documents
    pub index: String,
    /// Basic auth user
    pub username: Option<String>,
    /// Basic auth password
    pub password: Option<String>,
    /// Per-call timeout in seconds
    pub request_timeout: f64,
    /// Pool max size
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl ConnectionSettings {
    /// Per-call timeout; fails for zero, negative, NaN or out-of-range values
    pub fn timeout(&self) -> std::result::Result<Duration, SearchError> {
        let invalid = || {
            SearchError::Config(format!(
                "request_timeout must be a positive number of seconds, got {}",
                self.request_timeout
            ))
        };
        let timeout = Duration::try_from_secs_f64(self.request_timeout).map_err(|_| invalid())?;
        if timeout.is_zero() {
            return Err(invalid());
        }
        Ok(timeout)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            index: crate::DEFAULT_INDEX.to_string(),
            username: None,
            password: None,
            request_timeout: crate::DEFAULT_TIMEOUT as f64,
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Retry behavior for transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after the first attempt (0 disables retrying)
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// Fraction of the backoff added or removed at random
    pub jitter_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Scroll defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSettings {
    /// Server-side keep-alive of a scroll context, in seconds
    pub keep_alive_secs: u64,
    /// Hits per scroll page
    pub page_size: u32,
}

impl ScrollSettings {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            keep_alive_secs: 60,
            page_size: 10,
        }
    }
}

/// Default highlight markers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightSettings {
    pub pre_tag: String,
    pub post_tag: String,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            pre_tag: "<em>".to_string(),
            post_tag: "</em>".to_string(),
        }
    }
}

/// Search behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Page size used when a query does not set one
    pub default_page_size: u32,
    /// Upper bound of `from + size` accepted by the engine
    pub max_result_window: u64,
    /// Check every mapped hit against the query criteria and log violations
    pub verify_hits: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_result_window: crate::MAX_RESULT_WINDOW,
            verify_hits: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.connection.index, "hotel");
        assert_eq!(settings.scroll.keep_alive_secs, 60);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_yaml_partial_override() {
        let yaml = r#"
connection:
  url: "http://es.internal:9200"
  request_timeout: 2.5
scroll:
  page_size: 50
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.connection.url, "http://es.internal:9200");
        assert_eq!(settings.connection.index, "hotel");
        assert_eq!(settings.connection.timeout().unwrap(), Duration::from_millis(2500));
        assert_eq!(settings.scroll.page_size, 50);
        assert_eq!(settings.scroll.keep_alive_secs, 60);
    }

    #[test]
    fn test_zero_keep_alive_rejected() {
        let mut settings = Settings::default();
        settings.scroll.keep_alive_secs = 0;
        assert!(matches!(settings.validate(), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_request_timeout_out_of_range_rejected() {
        for timeout in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e30] {
            let mut settings = Settings::default();
            settings.connection.request_timeout = timeout;
            assert!(
                matches!(settings.validate(), Err(SearchError::Config(_))),
                "timeout {} accepted",
                timeout
            );
            assert!(settings.connection.timeout().is_err());
        }
    }

    #[test]
    fn test_bad_url_rejected() {
        let mut settings = Settings::default();
        settings.connection.url = "not a url".to_string();
        assert!(matches!(settings.validate(), Err(SearchError::Config(_))));
    }
}
