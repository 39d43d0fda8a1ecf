use serde::Serialize;

use crate::error::AppError;
use crate::response::{ok, ApiResult};

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health() -> ApiResult<Health> {
    ok(Health { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct Pong {
    pub message: &'static str,
}

// ─── GET /api/v1/ping ────────────────────────────────────────────

pub async fn ping() -> ApiResult<Pong> {
    ok(Pong { message: "pong" })
}

// ─── Fallback ────────────────────────────────────────────────────

pub async fn not_found() -> AppError {
    AppError::not_found("Route not found")
}
