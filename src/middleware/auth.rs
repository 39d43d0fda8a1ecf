use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AuthSection;
use crate::error::AppError;

/// Authenticated caller, stored in both request and response extensions so
/// handlers and the lifecycle emitter can see who made the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

const ADMIN_HEADER: &str = "x-is-admin";

/// Static bearer-token check against `auth.token`.
pub async fn require_auth(
    State(auth): State<Arc<AuthSection>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(header) = req.headers().get(AUTHORIZATION) else {
        tracing::warn!(path = %req.uri().path(), "missing authorization header");
        return AppError::unauthorized("Authorization header is required").into_response();
    };

    let token = match header.to_str().ok().and_then(bearer_token) {
        Some(t) => t,
        None => {
            tracing::warn!(path = %req.uri().path(), "invalid authorization format");
            return AppError::unauthorized("Invalid authorization header format").into_response();
        }
    };

    if token != auth.token {
        tracing::error!(path = %req.uri().path(), "invalid token");
        return AppError::unauthorized("Invalid token").into_response();
    }

    let identity = CallerIdentity(auth.user_id.clone());
    req.extensions_mut().insert(identity.clone());

    let mut response = next.run(req).await;
    response.extensions_mut().insert(identity);
    response
}

/// Admin gate; install after [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req
        .headers()
        .get(ADMIN_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "true");

    if !is_admin {
        tracing::error!(path = %req.uri().path(), "unauthorized admin access attempt");
        return AppError::forbidden("Admin access required").into_response();
    }
    next.run(req).await
}

/// `"Bearer <token>"` with exactly one space-separated token.
fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_format() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
        assert_eq!(bearer_token("bearer abc"), None);
    }
}
