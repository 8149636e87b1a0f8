//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                     - Liveness check
//! GET    /health/ready               - Readiness check (database ping)
//!
//! # Catalog
//! GET    /products/{id}              - Product with in-stock flag
//! GET    /products/{id}/reviews      - Reviews, newest first, with average
//! POST   /products/{id}/reviews      - Submit a review (account)
//!
//! # Cart (account or guest)
//! GET    /cart                       - Cart with product details and subtotal
//! POST   /cart                       - Add { productId, quantity }
//! DELETE /cart                       - Clear
//! PUT    /cart/{productId}           - Set { quantity }
//! DELETE /cart/{productId}           - Remove line
//!
//! # Checkout
//! GET    /checkout/summary?state=    - Live stock, shipping and totals
//!
//! # Orders (account)
//! POST   /orders                     - Place an order (rate limited)
//! GET    /orders/user                - Caller's orders, newest first
//! GET    /orders/{id}                - One of the caller's orders
//! PUT    /orders/{id}                - Update status / paid flag (admin)
//!
//! # Wishlist (account)
//! GET    /wishlist                   - Saved products
//! POST   /wishlist                   - Save { productId }
//! DELETE /wishlist/{productId}       - Forget
//!
//! # Admin
//! GET    /admin/orders?status=       - All orders, optionally by status
//! ```

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod wishlist;

#[cfg(test)]
pub(crate) mod testing;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::SessionStore;
use tracing::Span;

use crate::error::AppError;
use crate::middleware::{create_session_layer, order_rate_limiter, request_id_middleware};
use crate::state::AppState;

/// JSON body extractor whose rejections render as `AppError` (400).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejections render as `AppError` (400).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query extractor whose rejections render as `AppError` (400).
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route(
            "/{id}/reviews",
            get(products::reviews).post(products::submit_review),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/{product_id}", put(cart::update).delete(cart::remove))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::create).layer(order_rate_limiter()))
        .route("/user", get(orders::mine))
        .route("/{id}", get(orders::show).put(orders::update))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::index).post(wishlist::add))
        .route("/{product_id}", axum::routing::delete(wishlist::remove))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/orders", get(admin::orders))
}

/// Create all API routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/checkout/summary", get(checkout::summary))
        .nest("/orders", order_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/admin", admin_routes())
}

/// Build the application: routes plus session, request ID and tracing layers.
///
/// Sentry layers are added by the binary, outermost.
pub fn app<S>(state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    with_layers(routes(), state, session_store)
}

pub(crate) fn with_layers<S>(routes: Router<AppState>, state: AppState, session_store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(session_store, state.config());

    routes
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable. Without
/// a database (in-memory stores) the service is always ready.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(pool) = state.pool() else {
        return StatusCode::OK;
    };
    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
