use axum::{
    handler::Handler,
    middleware as axum_mw,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers::{products, system, users};
use crate::metrics::stream;
use crate::middleware::{auth, formatter, lifecycle, logger, recovery, request_id};
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_cfg = Arc::new(state.config.auth.clone());
    let emitter = Arc::new(lifecycle::LifecycleEmitter::new(
        Arc::clone(&state.bus),
        &state.config.events,
    ));
    let require_auth = axum_mw::from_fn_with_state(auth_cfg, auth::require_auth);
    let require_admin = axum_mw::from_fn(auth::require_admin);

    // ── Public ──────────────────────────────────────────────────
    let public = Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(stream::get_snapshot))
        .route("/api/v1/ping", get(system::ping))
        .route("/api/v1/users/register", post(users::register))
        .route("/api/v1/users/login", post(users::login));

    // ── Authenticated ───────────────────────────────────────────
    let authed = Router::new()
        .route("/api/v1/users", get(users::list_users))
        .route(
            "/api/v1/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user.layer(require_admin.clone())),
        )
        .route("/api/v1/users/:id/password", put(users::change_password))
        .route(
            "/api/v1/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/v1/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/api/v1/products/:id/stock", put(products::update_stock))
        .route(
            "/api/v1/products/category/:id",
            get(products::list_by_category),
        )
        .route_layer(require_auth.clone());

    // ── Admin metrics ───────────────────────────────────────────
    let admin = Router::new()
        .route("/api/v1/admin/metrics", get(stream::get_metrics))
        .route("/api/v1/admin/metrics/routes", get(stream::get_route_metrics))
        .route("/api/v1/admin/metrics/errors", get(stream::get_error_metrics))
        .route("/api/v1/admin/metrics/stream", get(stream::metrics_stream))
        // applied bottom-up: auth runs before the admin check
        .route_layer(require_admin)
        .route_layer(require_auth);

    public
        .merge(authed)
        .merge(admin)
        .fallback(system::not_found)
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(recovery::layer())
        .layer(axum_mw::from_fn(formatter::format_response))
        .layer(axum_mw::from_fn_with_state(emitter, lifecycle::emit_lifecycle))
        .layer(axum_mw::from_fn(logger::log_requests))
        .layer(axum_mw::from_fn(request_id::propagate_request_id))
        .layer(CorsLayer::permissive())
}
