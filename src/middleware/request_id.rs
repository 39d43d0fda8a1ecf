use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest inbound id we are willing to echo back.
const MAX_INBOUND_LEN: usize = 128;

/// Per-request identifier, stored in the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Reuse an inbound `X-Request-ID` when it is sane, else mint a UUID v4.
/// The id is stored on the request and echoed on the response.
pub async fn propagate_request_id(mut req: Request, next: Next) -> Response {
    let id = resolve(req.headers());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, val);
    }
    response
}

fn resolve(headers: &HeaderMap) -> String {
    headers
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_INBOUND_LEN)
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_inbound_id() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("abc-123"));
        assert_eq!(resolve(&headers), "abc-123");
    }

    #[test]
    fn mints_when_missing_or_oversized() {
        let minted = resolve(&HeaderMap::new());
        assert!(uuid::Uuid::parse_str(&minted).is_ok());

        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_INBOUND_LEN + 1);
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_ne!(resolve(&headers), long);
    }
}
