use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::{HeaderValue, StatusCode};

/// Error type shared by every request path.
///
/// The `Display` text of every variant except [`ProxyError::Upstream`] is the
/// plain-text body returned to the client.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("{0}")]
    Config(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    /// Backend answered with a non-2xx status; forwarded to the client verbatim.
    #[error("Upstream error: status={status}")]
    Upstream {
        status: u16,
        content_type: Option<HeaderValue>,
        body: Bytes,
    },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Internal(String),
}

/// Broad error category for status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    NotFound,
    Upstream,
    ServerError,
}

impl ProxyError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ProxyError::NotFound(_) => ErrorCategory::NotFound,
            ProxyError::Upstream { .. } => ErrorCategory::Upstream,
            ProxyError::Config(_) | ProxyError::Transport(_) | ProxyError::Internal(_) => {
                ErrorCategory::ServerError
            }
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status)
                    .unwrap_or_else(|_| http_status_for_category(ErrorCategory::Upstream))
            }
            other => http_status_for_category(other.category()),
        }
    }
}

fn http_status_for_category(cat: ErrorCategory) -> StatusCode {
    match cat {
        ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
        ErrorCategory::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ProxyError::Upstream {
                content_type, body, ..
            } => {
                let mut response = Response::new(Body::from(body));
                *response.status_mut() = status;
                if let Some(content_type) = content_type {
                    response
                        .headers_mut()
                        .insert(http::header::CONTENT_TYPE, content_type);
                }
                response
            }
            other => {
                if other.category() == ErrorCategory::ServerError {
                    tracing::error!("request failed: {other}");
                }
                (
                    status,
                    [(
                        http::header::CONTENT_TYPE,
                        HeaderValue::from_static("text/plain; charset=utf-8"),
                    )],
                    other.to_string(),
                )
                    .into_response()
            }
        }
    }
}
