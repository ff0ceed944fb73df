//! Shopify Customer authentication extractor.
//!
//! The customer access token obtained during OAuth lives in the session.
//! Expired tokens are refreshed transparently when Shopify issued a refresh
//! token; otherwise the customer is treated as signed out.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;
use tracing::{debug, warn};

use crate::models::session_keys;
use crate::shopify::CustomerAccessToken;
use crate::state::AppState;

/// Extractor that requires Shopify Customer authentication.
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireShopifyCustomer(token): RequireShopifyCustomer,
/// ) -> impl IntoResponse {
///     // Use token.access_token to make Shopify Customer API calls
/// }
/// ```
pub struct RequireShopifyCustomer(pub CustomerAccessToken);

/// Error returned when Shopify Customer authentication is required but not present.
#[derive(Debug, PartialEq, Eq)]
pub enum ShopifyCustomerRejection {
    /// Redirect to Shopify login page (for page requests).
    RedirectToLogin,
    /// Unauthorized JSON response (for API requests).
    Unauthorized,
}

impl ShopifyCustomerRejection {
    fn for_path(path: &str) -> Self {
        if path.starts_with("/api/") {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin
        }
    }
}

impl IntoResponse for ShopifyCustomerRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/shopify/login").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "ok": false, "error": "Not signed in." })),
            )
                .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireShopifyCustomer
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ShopifyCustomerRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let rejection = ShopifyCustomerRejection::for_path(parts.uri.path());

        // Set by SessionManagerLayer
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Err(rejection);
        };

        let token: CustomerAccessToken = session
            .get(session_keys::SHOPIFY_CUSTOMER_TOKEN)
            .await
            .ok()
            .flatten()
            .ok_or(rejection)?;

        if !token.is_expired() {
            return Ok(Self(token));
        }

        let state = AppState::from_ref(state);
        refresh_customer_token(&state, &session, token)
            .await
            .map(Self)
            .ok_or_else(|| ShopifyCustomerRejection::for_path(parts.uri.path()))
    }
}

/// Exchange an expired token's refresh token for a new one.
///
/// On failure the stale token is dropped from the session.
async fn refresh_customer_token(
    state: &AppState,
    session: &Session,
    expired: CustomerAccessToken,
) -> Option<CustomerAccessToken> {
    let refreshed = match expired.refresh_token.as_deref() {
        Some(refresh_token) => state.customer().refresh_token(refresh_token).await,
        None => {
            debug!("Customer token expired without refresh token");
            let _ = clear_shopify_customer_token(session).await;
            return None;
        }
    };

    match refreshed {
        Ok(mut token) => {
            // Refresh responses omit the ID token; keep it for logout.
            if token.id_token.is_none() {
                token.id_token = expired.id_token;
            }
            if token.refresh_token.is_none() {
                token.refresh_token = expired.refresh_token;
            }
            if let Err(e) = set_shopify_customer_token(session, &token).await {
                warn!(error = %e, "Failed to store refreshed customer token");
            }
            Some(token)
        }
        Err(e) => {
            warn!(error = %e, "Customer token refresh failed");
            let _ = clear_shopify_customer_token(session).await;
            None
        }
    }
}

/// Helper to set the Shopify customer token in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_shopify_customer_token(
    session: &Session,
    token: &CustomerAccessToken,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::SHOPIFY_CUSTOMER_TOKEN, token)
        .await
}

/// Helper to clear the Shopify customer token from the session.
///
/// Returns the token that was stored, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_shopify_customer_token(
    session: &Session,
) -> Result<Option<CustomerAccessToken>, tower_sessions::session::Error> {
    session
        .remove::<CustomerAccessToken>(session_keys::SHOPIFY_CUSTOMER_TOKEN)
        .await
}
