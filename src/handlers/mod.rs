pub mod products;
pub mod system;
pub mod users;

use axum::extract::rejection::PathRejection;
use axum::extract::Path;
use serde::Serialize;

use crate::error::AppError;

/// `{message}` body for mutations that return nothing else.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Numeric `:id` path segment; anything else is a 400 with `what` in it.
fn path_id(path: Result<Path<i64>, PathRejection>, what: &str) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::bad_request(format!("Invalid {what} ID")))
}

/// Run CPU-heavy service work (password hashing) off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task failed");
        AppError::internal("Internal server error")
    })?
}
