use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{blocking, path_id, Message};
use crate::error::AppError;
use crate::models::User;
use crate::pagination::{Page, PageQuery};
use crate::response::{ok, ApiResult};
use crate::services::users::{ChangePassword, Login, RegisterUser, UpdateUser};
use crate::services::parse;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

// ─── POST /api/v1/users/register ─────────────────────────────────

pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<User> {
    let Json(body) = body?;
    let req: RegisterUser = parse(body)?;

    let users = state.users.clone();
    let user = blocking(move || users.register(req).map_err(AppError::from)).await?;
    ok(user)
}

// ─── POST /api/v1/users/login ────────────────────────────────────

pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(body) = body?;
    let req: Login = parse(body)?;

    let users = state.users.clone();
    let user = blocking(move || users.authenticate(&req).map_err(AppError::from)).await?;
    ok(LoginResponse {
        user,
        token: state.config.auth.token.clone(),
    })
}

// ─── GET /api/v1/users ───────────────────────────────────────────

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Page<User>> {
    let Query(query) = query?;
    ok(state.users.list(query.validate()?))
}

// ─── GET /api/v1/users/:id ───────────────────────────────────────

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<User> {
    let id = path_id(id, "user")?;
    ok(state.users.get(id)?)
}

// ─── PUT /api/v1/users/:id ───────────────────────────────────────

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<User> {
    let id = path_id(id, "user")?;
    let Json(body) = body?;
    let req: UpdateUser = parse(body)?;
    ok(state.users.update(id, req)?)
}

// ─── PUT /api/v1/users/:id/password ──────────────────────────────

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Message> {
    let id = path_id(id, "user")?;
    let Json(body) = body?;
    let req: ChangePassword = parse(body)?;

    let users = state.users.clone();
    blocking(move || users.change_password(id, req).map_err(AppError::from)).await?;
    ok(Message {
        message: "Password updated successfully",
    })
}

// ─── DELETE /api/v1/users/:id ────────────────────────────────────

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Message> {
    let id = path_id(id, "user")?;
    state.users.delete(id)?;
    ok(Message {
        message: "User deleted successfully",
    })
}
