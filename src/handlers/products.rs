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

use super::{path_id, Message};
use crate::models::Product;
use crate::pagination::{Page, PageQuery};
use crate::response::{ok, ApiResult};
use crate::services::parse;
use crate::services::products::{CreateProduct, StockUpdate, UpdateProduct};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CategoryProducts {
    pub products: Vec<Product>,
}

// ─── GET /api/v1/products ────────────────────────────────────────

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Page<Product>> {
    let Query(query) = query?;
    ok(state.products.list(query.validate()?))
}

// ─── GET /api/v1/products/:id ────────────────────────────────────

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Product> {
    let id = path_id(id, "product")?;
    ok(state.products.get(id)?)
}

// ─── POST /api/v1/products ───────────────────────────────────────

pub async fn create_product(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Product> {
    let Json(body) = body?;
    let req: CreateProduct = parse(body)?;
    ok(state.products.create(req)?)
}

// ─── PUT /api/v1/products/:id ────────────────────────────────────

pub async fn update_product(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Product> {
    let id = path_id(id, "product")?;
    let Json(body) = body?;
    let req: UpdateProduct = parse(body)?;
    ok(state.products.update(id, req)?)
}

// ─── DELETE /api/v1/products/:id ─────────────────────────────────

pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Message> {
    let id = path_id(id, "product")?;
    state.products.delete(id)?;
    ok(Message {
        message: "Product deleted successfully",
    })
}

// ─── PUT /api/v1/products/:id/stock ──────────────────────────────

pub async fn update_stock(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Message> {
    let id = path_id(id, "product")?;
    let Json(body) = body?;
    let req: StockUpdate = parse(body)?;
    state.products.update_stock(id, req.quantity)?;
    ok(Message {
        message: "Product stock updated successfully",
    })
}

// ─── GET /api/v1/products/category/:id ───────────────────────────

pub async fn list_by_category(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<CategoryProducts> {
    let id = path_id(id, "category")?;
    ok(CategoryProducts {
        products: state.products.list_by_category(id),
    })
}
