//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (database)
//!
//! # Cart
//! GET  /cart/buy-again           - Add lines to the cart, 303 to /?open=cart
//!
//! # Shopify Customer OAuth
//! GET  /auth/shopify/login       - Redirect to Shopify OAuth
//! GET  /auth/shopify/callback    - Handle OAuth callback
//! POST /auth/shopify/logout      - Logout from Shopify
//!
//! # Notifications API (requires customer)
//! GET  /api/notifications        - Synced notification list
//! POST /api/notifications/read   - Mark one notification read
//! ```

pub mod api;
pub mod cart;
pub mod health;
pub mod shopify_auth;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/buy-again", get(cart::buy_again))
        .layer(api_rate_limiter())
}

/// Create the Shopify Customer Account auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/shopify/login", get(shopify_auth::login))
        .route("/shopify/callback", get(shopify_auth::callback))
        .route("/shopify/logout", post(shopify_auth::logout))
        .layer(auth_rate_limiter())
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(api::notifications::list))
        .route("/notifications/read", post(api::notifications::mark_read))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/cart", cart_routes())
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}
