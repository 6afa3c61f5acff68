use crate::config::UpstreamConfig;
use crate::error::ProxyError;

const GENERATE_CONTENT: &str = "generateContent";
const STREAM_GENERATE_CONTENT: &str = "streamGenerateContent";
const BATCH_EMBED_CONTENTS: &str = "batchEmbedContents";

/// Precomputed backend URLs and headers used by hot request paths.
#[derive(Debug, Clone)]
pub struct PreparedUpstream {
    /// `{base_url}/{api_version}`, without a trailing slash.
    versioned_base: String,
    models_url: Option<url::Url>,
    static_headers: http::HeaderMap,
}

impl PreparedUpstream {
    /// Build a prepared upstream cache from configuration.
    #[must_use]
    pub fn new(upstream: &UpstreamConfig) -> Self {
        let base = upstream.base_url.trim_end_matches('/');
        let version = upstream.api_version.trim_matches('/');
        let versioned_base = format!("{base}/{version}");
        let models_url = url::Url::parse(&format!("{versioned_base}/models")).ok();

        let mut static_headers = http::HeaderMap::new();
        match http::HeaderValue::from_str(&upstream.api_client) {
            Ok(val) => {
                static_headers.insert("x-goog-api-client", val);
            }
            Err(_) => {
                tracing::warn!(
                    api_client = %upstream.api_client,
                    "upstream.api_client is not a valid header value; header omitted"
                );
            }
        }

        Self {
            versioned_base,
            models_url,
            static_headers,
        }
    }

    /// `models/{model}:generateContent`, or `:streamGenerateContent?alt=sse`
    /// when streaming.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] when the model name does not
    /// form a valid URL.
    pub fn generate_content_url(&self, model: &str, stream: bool) -> Result<url::Url, ProxyError> {
        let task = if stream {
            STREAM_GENERATE_CONTENT
        } else {
            GENERATE_CONTENT
        };
        let mut url = self.parse(&format!("{}/models/{model}:{task}", self.versioned_base))?;
        if stream {
            url.query_pairs_mut().append_pair("alt", "sse");
        }
        Ok(url)
    }

    /// `{model}:batchEmbedContents`, where `model` already carries its
    /// `models/` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidRequest`] when the model name does not
    /// form a valid URL.
    pub fn batch_embed_url(&self, model: &str) -> Result<url::Url, ProxyError> {
        self.parse(&format!(
            "{}/{model}:{BATCH_EMBED_CONTENTS}",
            self.versioned_base
        ))
    }

    /// # Errors
    ///
    /// Returns [`ProxyError::Config`] when the configured base URL is unusable.
    pub fn models_url(&self) -> Result<url::Url, ProxyError> {
        self.models_url.clone().ok_or_else(|| {
            ProxyError::Config(format!("Invalid models URL: {}/models", self.versioned_base))
        })
    }

    /// Static headers plus `x-goog-api-key` when a key was supplied.
    #[must_use]
    pub fn request_headers(&self, api_key: Option<&str>) -> http::HeaderMap {
        let mut headers = self.static_headers.clone();
        if let Some(val) = api_key.and_then(|key| http::HeaderValue::from_str(key).ok()) {
            headers.insert("x-goog-api-key", val);
        }
        headers
    }

    /// [`Self::request_headers`] plus a JSON content type.
    #[must_use]
    pub fn json_request_headers(&self, api_key: Option<&str>) -> http::HeaderMap {
        let mut headers = self.request_headers(api_key);
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        headers
    }

    fn parse(&self, raw: &str) -> Result<url::Url, ProxyError> {
        url::Url::parse(raw)
            .map_err(|err| ProxyError::InvalidRequest(format!("Invalid upstream URL {raw}: {err}")))
    }
}
