//! Main InshadClient

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use url::Url;

use crate::auth::KeyProvider;
use crate::auth::StaticKeyProvider;
use crate::error::ApiError;
use crate::error::AuthError;
use crate::error::Error;
use crate::model::Row;
use crate::rate_limit::ConcurrencyLimiter;
use crate::rate_limit::RetryConfig;

/// Maximum random jitter added to each retry backoff delay.
const RETRY_JITTER_MS: u64 = 250;

/// The main client for the content service's REST API.
///
/// This client is cheap to clone (uses `Arc` internally) and can be shared
/// across threads safely. It implements
/// [`RemoteSource`](crate::source::RemoteSource), so it plugs directly into
/// the cached fetch layer.
///
/// # Example
///
/// ```ignore
/// use inshad_lib::InshadClient;
///
/// let client = InshadClient::builder()
///     .url("https://content.inshad.example")
///     .api_key("public-anon-key")
///     .build();
///
/// client.connect().await?;
/// ```
#[derive(Clone)]
pub struct InshadClient {
    inner: Arc<InshadClientInner>,
}

struct InshadClientInner {
    base_url: String,
    rest_path: String,
    key_provider: Arc<dyn KeyProvider>,
    http_client: reqwest::Client,
    timeout: Option<Duration>,
    retry: RetryConfig,
    limiter: ConcurrencyLimiter,
}

impl InshadClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> InshadClientBuilder<Missing, Missing> {
        InshadClientBuilder::new()
    }

    /// Validates connectivity to the content service.
    ///
    /// Probes the API root to verify the service is reachable and the API
    /// key is accepted.
    pub async fn connect(&self) -> Result<(), Error> {
        let url = self.rest_url("", &[])?;
        let key = self.api_key().await?;

        let mut request = self
            .inner
            .http_client
            .get(url)
            .header("apikey", &key)
            .bearer_auth(&key);

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(ApiError::from)?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(Error::Auth(AuthError::Rejected {
                status: status.as_u16(),
            }))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Api(ApiError::http(status.as_u16(), body)))
        }
    }

    /// Returns the base URL of the content service.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Fetches rows from a table with the given query parameters, honoring
    /// the concurrency limit and retrying transient failures.
    pub(crate) async fn get_rows(
        &self,
        table: &str,
        query: &[(String, String)],
    ) -> Result<Vec<Row>, ApiError> {
        let url = self.rest_url(table, query)?;
        let key = self.api_key().await.map_err(|err| match err {
            Error::Auth(auth) => ApiError::http(401, auth.to_string()),
            other => ApiError::http(401, other.to_string()),
        })?;

        let mut attempt = 0;
        loop {
            let result = {
                let _permit = self.inner.limiter.acquire().await;
                self.send_get(&url, &key).await
            };

            match result {
                Ok(rows) => return Ok(rows),
                Err(err) if attempt < self.inner.retry.max_retries && err.is_retryable() => {
                    let jitter =
                        Duration::from_millis(rand::rng().random_range(0..RETRY_JITTER_MS));
                    let delay = self.inner.retry.delay_for_attempt(attempt) + jitter;
                    log::debug!(
                        "[client] retrying '{}' after {:?} (attempt {}): {}",
                        table,
                        delay,
                        attempt + 1,
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_get(&self, url: &Url, key: &str) -> Result<Vec<Row>, ApiError> {
        let mut request = self
            .inner
            .http_client
            .get(url.clone())
            .header("apikey", key)
            .bearer_auth(key)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;

        if response.status().is_success() {
            let body = response.text().await?;
            serde_json::from_str(&body)
                .map_err(|err| ApiError::parse_with_body(err.to_string(), body))
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::http(status, body))
        }
    }

    fn rest_url(&self, table: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let base = format!(
            "{}/{}/{}",
            self.inner.base_url.trim_end_matches('/'),
            self.inner.rest_path.trim_matches('/'),
            table
        );
        Url::parse_with_params(&base, query)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {}", base, err)))
    }

    async fn api_key(&self) -> Result<String, Error> {
        Ok(self.inner.key_provider.api_key().await?)
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing an [`InshadClient`].
///
/// Uses the typestate pattern to ensure required fields are set at compile
/// time.
///
/// # Required Fields
///
/// - `url` - The content service URL
/// - `api_key` or `key_provider` - Credentials for the service
///
/// # Example
///
/// ```ignore
/// let client = InshadClient::builder()
///     .url("https://content.inshad.example")
///     .api_key("public-anon-key")
///     .timeout(Duration::from_secs(30))
///     .build();
/// ```
pub struct InshadClientBuilder<Url, Provider> {
    url: Url,
    key_provider: Provider,
    rest_path: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
    retry: RetryConfig,
    concurrency: Option<usize>,
}

impl InshadClientBuilder<Missing, Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            key_provider: Missing,
            rest_path: "rest/v1".to_string(),
            timeout: None,
            connect_timeout: None,
            http_client: None,
            retry: RetryConfig::default(),
            concurrency: None,
        }
    }
}

impl Default for InshadClientBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> InshadClientBuilder<Missing, P> {
    /// Sets the content service URL.
    ///
    /// # Example
    ///
    /// ```ignore
    /// .url("https://content.inshad.example")
    /// ```
    pub fn url(self, url: impl Into<String>) -> InshadClientBuilder<Set<String>, P> {
        InshadClientBuilder {
            url: Set(url.into()),
            key_provider: self.key_provider,
            rest_path: self.rest_path,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            http_client: self.http_client,
            retry: self.retry,
            concurrency: self.concurrency,
        }
    }
}

impl<U> InshadClientBuilder<U, Missing> {
    /// Sets the key provider for authentication.
    pub fn key_provider<K: KeyProvider + 'static>(
        self,
        provider: K,
    ) -> InshadClientBuilder<U, Set<Arc<dyn KeyProvider>>> {
        InshadClientBuilder {
            url: self.url,
            key_provider: Set(Arc::new(provider) as Arc<dyn KeyProvider>),
            rest_path: self.rest_path,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            http_client: self.http_client,
            retry: self.retry,
            concurrency: self.concurrency,
        }
    }

    /// Sets a static API key for authentication.
    ///
    /// Shorthand for `key_provider(StaticKeyProvider::new(key))`.
    pub fn api_key(
        self,
        key: impl Into<String>,
    ) -> InshadClientBuilder<U, Set<Arc<dyn KeyProvider>>> {
        self.key_provider(StaticKeyProvider::new(key))
    }
}

impl<U, P> InshadClientBuilder<U, P> {
    /// Sets the REST path prefix.
    ///
    /// Defaults to `rest/v1`.
    pub fn rest_path(mut self, path: impl Into<String>) -> Self {
        self.rest_path = path.into();
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// This is applied when building the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a default client will be created.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the maximum number of concurrent requests.
    pub fn concurrency(mut self, limit: usize) -> Self {
        self.concurrency = Some(limit);
        self
    }
}

impl InshadClientBuilder<Set<String>, Set<Arc<dyn KeyProvider>>> {
    /// Builds the [`InshadClient`].
    ///
    /// This method is only available when both `url` and a key provider
    /// have been set.
    pub fn build(self) -> InshadClient {
        let http_client = self.http_client.unwrap_or_else(|| {
            let mut builder = reqwest::Client::builder();
            if let Some(timeout) = self.connect_timeout {
                builder = builder.connect_timeout(timeout);
            }
            builder.build().expect("Failed to build HTTP client")
        });

        let limiter = self
            .concurrency
            .map(ConcurrencyLimiter::new)
            .unwrap_or_default();

        InshadClient {
            inner: Arc::new(InshadClientInner {
                base_url: self.url.0,
                rest_path: self.rest_path,
                key_provider: self.key_provider.0,
                http_client,
                timeout: self.timeout,
                retry: self.retry,
                limiter,
            }),
        }
    }
}
