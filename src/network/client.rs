//! reqwest-backed transport to the search engine

use super::retry::Backoff;
use super::transport::{ApiRequest, ApiResponse, HttpMethod, Transport};
use crate::config::{ConnectionSettings, RetrySettings};
use crate::error::{Result, SearchError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// HTTP transport with per-call timeout and retry of transient failures
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    timeout: Duration,
    credentials: Option<(String, Option<String>)>,
    backoff: Backoff,
}

impl HttpTransport {
    /// Create a transport from connection and retry settings
    pub fn new(settings: &ConnectionSettings, retry: &RetrySettings) -> Result<Self> {
        let mut base_url = Url::parse(&settings.url)
            .map_err(|e| SearchError::Config(format!("invalid url '{}': {}", settings.url, e)))?;
        // Url::join drops the last path segment unless it ends with a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            HeaderValue::from_static(concat!("hotel-search-rs/", env!("CARGO_PKG_VERSION"))),
        );
        for (key, value) in &settings.extra_headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| SearchError::Config(format!("invalid header '{}': {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| SearchError::Config(format!("invalid header '{}': {}", key, e)))?;
            headers.insert(name, value);
        }

        let timeout = settings.timeout()?;
        let mut builder = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(settings.pool_maxsize)
            .default_headers(headers)
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            timeout,
            credentials: settings
                .username
                .clone()
                .map(|user| (user, settings.password.clone())),
            backoff: Backoff::new(retry.clone()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SearchError::Config(format!("invalid request path '{}': {}", path, e)))
    }

    /// One attempt, no retries
    async fn send_once(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request.path)?;
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        req_builder = req_builder.timeout(self.timeout);

        if let Some((ref user, ref password)) = self.credentials {
            req_builder = req_builder.basic_auth(user, password.as_ref());
        }

        if !request.params.is_empty() {
            req_builder = req_builder.query(&request.params);
        }

        if let Some(ref body) = request.body {
            req_builder = req_builder.json(body);
        }

        let response = req_builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        Ok(ApiResponse { status, text })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut attempt = 0;
        loop {
            debug!("{:?} /{} (attempt {})", request.method, request.path, attempt + 1);
            let outcome = self.send_once(&request).await;

            let retryable = match &outcome {
                Ok(response) => response.is_transient_failure(),
                Err(e) => e.is_retryable(),
            };
            if !retryable || !request.idempotent || attempt >= self.backoff.max_retries() {
                return outcome;
            }

            let delay = self.backoff.delay(attempt);
            match &outcome {
                Ok(response) => warn!(
                    "/{} returned {}, retrying in {:?}",
                    request.path, response.status, delay
                ),
                Err(e) => warn!("/{} failed: {}, retrying in {:?}", request.path, e, delay),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry(max_retries: u32) -> RetrySettings {
        RetrySettings {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }

    fn connection(url: &str) -> ConnectionSettings {
        ConnectionSettings {
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_transport_creation() {
        let transport = HttpTransport::new(&ConnectionSettings::default(), &RetrySettings::default());
        assert!(transport.is_ok());

        let bad = HttpTransport::new(&connection("::not-a-url::"), &RetrySettings::default());
        assert!(matches!(bad, Err(SearchError::Config(_))));
    }

    #[tokio::test]
    async fn test_unusable_timeout_is_config_error() {
        for timeout in [1e30, -2.0, f64::NAN] {
            let settings = ConnectionSettings {
                request_timeout: timeout,
                ..Default::default()
            };
            let transport = HttpTransport::new(&settings, &RetrySettings::default());
            assert!(matches!(transport, Err(SearchError::Config(_))));
        }
    }

    #[tokio::test]
    async fn test_base_path_prefix_is_kept() {
        let transport =
            HttpTransport::new(&connection("http://proxy.local/es"), &RetrySettings::default())
                .unwrap();
        assert_eq!(
            transport.url_for("hotel/_search").unwrap().as_str(),
            "http://proxy.local/es/hotel/_search"
        );
    }

    #[tokio::test]
    async fn test_sends_params_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hotel/_search"))
            .and(query_param("scroll", "60s"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = connection(&server.uri());
        settings.username = Some("elastic".to_string());
        settings.password = Some("changeme".to_string());
        let transport = HttpTransport::new(&settings, &fast_retry(0)).unwrap();

        let response = transport
            .send(ApiRequest::post("hotel/_search").param("scroll", "60s").json(serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_retries_transient_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hotel/_search"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hotel/_search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&connection(&server.uri()), &fast_retry(2)).unwrap();
        let response = transport.send(ApiRequest::post("hotel/_search")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_non_idempotent_request_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(&connection(&server.uri()), &fast_retry(3)).unwrap();
        let response = transport
            .send(ApiRequest::post("_search/scroll").not_idempotent())
            .await
            .unwrap();
        assert_eq!(response.status, 503);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Nothing listens on port 1
        let transport =
            HttpTransport::new(&connection("http://127.0.0.1:1"), &fast_retry(1)).unwrap();
        let err = transport.send(ApiRequest::get("hotel")).await.unwrap_err();
        assert!(matches!(err, SearchError::Transport(_)), "{:?}", err);
    }
}
