use std::future::Future;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex_lite::Regex;

use crate::error::ProxyError;
use crate::protocol::gemini::GeminiInlineData;
use crate::transport::HttpTransport;

static DATA_URI_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^data:(?P<mime>.*?)(?:;base64)?,(?P<data>.*)$").ok());

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Turns an `image_url` reference into an inline payload.
pub trait InlineDataResolver: Sync {
    fn resolve(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<GeminiInlineData, ProxyError>> + Send;
}

impl InlineDataResolver for HttpTransport {
    async fn resolve(&self, url: &str) -> Result<GeminiInlineData, ProxyError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return fetch_inline_data(self, url).await;
        }
        parse_data_uri(url)
    }
}

async fn fetch_inline_data(
    transport: &HttpTransport,
    url: &str,
) -> Result<GeminiInlineData, ProxyError> {
    let response = transport
        .fetch(url)
        .await
        .map_err(|err| ProxyError::InvalidRequest(format!("Error fetching image: {err}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProxyError::InvalidRequest(format!(
            "Error fetching image: {status} ({url})"
        )));
    }
    let mime_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(FALLBACK_MIME_TYPE)
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|err| ProxyError::InvalidRequest(format!("Error fetching image: {err}")))?;
    tracing::debug!(url, mime_type = %mime_type, len = bytes.len(), "fetched image reference");
    Ok(GeminiInlineData {
        mime_type,
        data: STANDARD.encode(&bytes),
    })
}

/// Split a `data:<mime>[;base64],<data>` URI. The payload is taken as-is.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidRequest`] when `url` is not a data URI.
pub fn parse_data_uri(url: &str) -> Result<GeminiInlineData, ProxyError> {
    let caps = DATA_URI_RE
        .as_ref()
        .and_then(|re| re.captures(url))
        .ok_or_else(|| ProxyError::InvalidRequest(format!("Invalid image data: {url}")))?;
    let mime_type = caps.name("mime").map_or("", |m| m.as_str());
    let data = caps.name("data").map_or("", |m| m.as_str());
    Ok(GeminiInlineData {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base64_data_uri() {
        let data = parse_data_uri("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(data.mime_type, "image/png");
        assert_eq!(data.data, "iVBORw0KGgo=");
    }

    #[test]
    fn test_parse_plain_data_uri() {
        let data = parse_data_uri("data:text/plain,hello").unwrap();
        assert_eq!(data.mime_type, "text/plain");
        assert_eq!(data.data, "hello");
    }

    #[test]
    fn test_reject_non_data_uri() {
        let err = parse_data_uri("ftp://example.com/cat.png").unwrap_err();
        assert_eq!(err.to_string(), "Invalid image data: ftp://example.com/cat.png");
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }
}
