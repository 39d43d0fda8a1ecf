use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

// ─── Shared response envelope ────────────────────────────────────

/// Wire shape of every JSON response: `{errno, errmsg, data, request_id}`.
#[derive(Debug, Clone, Serialize)]
pub struct StandardResponse {
    pub errno: i32,
    pub errmsg: String,
    pub data: Value,
    pub request_id: String,
}

/// Envelope contents minus the request id.
///
/// Handlers and `AppError` leave this in the response extensions with an
/// empty body; the formatter middleware stamps the request id on it and
/// writes the final JSON.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub errno: i32,
    pub errmsg: String,
    pub data: Value,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            errno: 0,
            errmsg: String::new(),
            data,
        }
    }

    pub fn into_standard(self, request_id: String) -> StandardResponse {
        StandardResponse {
            errno: self.errno,
            errmsg: self.errmsg,
            data: self.data,
            request_id,
        }
    }
}

/// Successful handler output. Serialized into the envelope's `data` slot.
#[derive(Debug, Clone)]
pub struct ApiResponse<T>(pub T);

pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(data) => {
                let mut response = StatusCode::OK.into_response();
                response.extensions_mut().insert(Envelope::success(data));
                response
            }
            Err(e) => AppError::internal(format!("response encoding failed: {e}"))
                .into_response(),
        }
    }
}

/// Shorthand for `Ok(ApiResponse(data))`.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(ApiResponse(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_leaves_envelope_extension() {
        let response = ApiResponse(json!({"message": "pong"})).into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope = response.extensions().get::<Envelope>().unwrap();
        assert_eq!(envelope.errno, 0);
        assert_eq!(envelope.data["message"], "pong");
    }

    #[test]
    fn standard_response_shape() {
        let body = Envelope::success(Value::Null).into_standard("req-1".into());
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(
            encoded,
            json!({"errno": 0, "errmsg": "", "data": null, "request_id": "req-1"})
        );
    }
}
