use http::header::AUTHORIZATION;

/// Extract the backend API key from the client's `Authorization` header.
///
/// The key is the second space-separated token (`Bearer <key>`); the scheme
/// word itself is not checked. A missing header or key yields `None` and the
/// request is forwarded without credentials.
#[must_use]
pub fn extract_api_key(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(' ').nth(1))
        .filter(|key| !key.is_empty())
}
