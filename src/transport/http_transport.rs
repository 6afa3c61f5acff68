use std::time::Duration;

use bytes::Bytes;

use crate::config::ServerConfig;
use crate::error::ProxyError;

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    timeout: Duration,
    use_env_proxy: bool,
) -> Result<reqwest::Client, ProxyError> {
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout);

    if !use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| ProxyError::Transport(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client shared by every backend call and image fetch.
///
/// Requests are sent exactly once; the proxy never retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a new transport with connection pooling and timeouts from the given server config.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };

        let client = match build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            Duration::from_secs(config.timeout),
            config.http_use_env_proxy,
        ) {
            Ok(client) => client,
            Err(err) => {
                tracing::error!(error = %err, "failed to build configured reqwest client, falling back to default client");
                reqwest::Client::new()
            }
        };
        Self { client }
    }

    /// Send a request to the backend. The response is returned whatever its
    /// status; see [`error_for_upstream_status`].
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the request cannot be executed.
    pub async fn send_request(
        &self,
        url: &url::Url,
        method: http::Method,
        headers: &http::HeaderMap,
        body: Option<Bytes>,
    ) -> Result<reqwest::Response, ProxyError> {
        let mut request = reqwest::Request::new(method, url.clone());
        *request.headers_mut() = headers.clone();
        if let Some(body) = body {
            *request.body_mut() = Some(reqwest::Body::from(body));
        }

        self.client
            .execute(request)
            .await
            .map_err(|err| ProxyError::Transport(err.to_string()))
    }

    /// Plain `GET` of an arbitrary URL, used for image references.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Transport`] when the request cannot be executed.
    pub async fn fetch(&self, url: &str) -> Result<reqwest::Response, ProxyError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|err| ProxyError::Transport(err.to_string()))
    }
}

/// Turn a non-2xx backend response into [`ProxyError::Upstream`] carrying
/// its status, content type and body unchanged.
///
/// # Errors
///
/// Returns the upstream error for non-2xx statuses, or
/// [`ProxyError::Transport`] when the error body cannot be read.
pub async fn error_for_upstream_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProxyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let content_type = response.headers().get(http::header::CONTENT_TYPE).cloned();
    let body = response
        .bytes()
        .await
        .map_err(|err| ProxyError::Transport(err.to_string()))?;
    tracing::debug!(status = status.as_u16(), "forwarding upstream error response");
    Err(ProxyError::Upstream {
        status: status.as_u16(),
        content_type,
        body,
    })
}
