use axum::{
    body::{Body, HttpBody},
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

use super::request_id::RequestId;
use crate::response::Envelope;

/// Renders the standard `{errno, errmsg, data, request_id}` body.
///
/// Handlers and errors leave an [`Envelope`] in the response extensions; an
/// empty 200 without one becomes an empty success envelope. Anything else
/// (SSE streams, CORS preflight) passes through untouched.
pub async fn format_response(req: Request, next: Next) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|r| r.0.clone())
        .unwrap_or_default();

    let mut response = next.run(req).await;

    let envelope = match response.extensions_mut().remove::<Envelope>() {
        Some(envelope) => envelope,
        None if response.status() == StatusCode::OK
            && response.body().size_hint().exact() == Some(0) =>
        {
            Envelope::success(Value::Null)
        }
        None => return response,
    };

    let body = match serde_json::to_vec(&envelope.into_standard(request_id)) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response envelope");
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            return response;
        }
    };

    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response.headers_mut().remove(header::CONTENT_LENGTH);
    *response.body_mut() = Body::from(body);
    response
}
