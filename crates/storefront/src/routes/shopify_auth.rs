//! Shopify Customer Account OAuth route handlers.
//!
//! Handles the OAuth flow for Shopify Customer Account authentication:
//! - Login: Redirects to Shopify's OAuth authorization page
//! - Callback: Handles the OAuth callback and exchanges code for tokens
//! - Logout: Clears the Shopify customer token and redirects to Shopify logout

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::distr::{Alphanumeric, SampleString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::clear_sentry_user;
use crate::middleware::{clear_shopify_customer_token, set_shopify_customer_token};
use crate::models::session_keys;
use crate::state::AppState;

/// Query parameters for starting a login.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Local path to return to after login.
    pub return_to: Option<String>,
}

/// Query parameters from Shopify OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), length)
}

/// Accept only same-site absolute paths as post-login targets.
fn sanitize_return_to(raw: Option<&str>) -> Option<&str> {
    raw.filter(|path| {
        path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
    })
}

fn callback_uri(state: &AppState) -> String {
    format!("{}/auth/shopify/callback", state.config().base_url)
}

/// Redirect home with a login error code the front end can surface.
fn login_failed(code: &str) -> Response {
    Redirect::to(&format!("/?login_error={code}")).into_response()
}

/// Initiate Shopify Customer Account OAuth login.
///
/// Generates state and nonce parameters, stores them in the session,
/// and redirects to Shopify's authorization page.
///
/// # Route
///
/// `GET /auth/shopify/login`
#[instrument(skip(state, session))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    let oauth_state = generate_random_string(32);
    let nonce = generate_random_string(32);

    let stored = async {
        session
            .insert(session_keys::SHOPIFY_OAUTH_STATE, &oauth_state)
            .await?;
        session
            .insert(session_keys::SHOPIFY_OAUTH_NONCE, &nonce)
            .await?;
        if let Some(path) = sanitize_return_to(query.return_to.as_deref()) {
            session.insert(session_keys::SHOPIFY_RETURN_TO, path).await?;
        }
        Ok::<_, tower_sessions::session::Error>(())
    }
    .await;

    if let Err(e) = stored {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return login_failed("session");
    }

    let auth_url = state
        .customer()
        .authorization_url(&callback_uri(&state), &oauth_state, &nonce);

    Redirect::to(&auth_url).into_response()
}

/// Handle Shopify OAuth callback.
///
/// Validates the state parameter, exchanges the authorization code for tokens,
/// and stores the customer access token in the session.
///
/// # Route
///
/// `GET /auth/shopify/callback`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "Shopify OAuth error");
        return login_failed("shopify_denied");
    }

    let Some(code) = query.code else {
        tracing::warn!("Shopify OAuth callback missing code");
        return login_failed("missing_code");
    };

    let Some(returned_state) = query.state else {
        tracing::warn!("Shopify OAuth callback missing state");
        return login_failed("missing_state");
    };

    let stored_state: Option<String> = session
        .remove(session_keys::SHOPIFY_OAUTH_STATE)
        .await
        .ok()
        .flatten();
    let _ = session
        .remove::<String>(session_keys::SHOPIFY_OAUTH_NONCE)
        .await;

    if stored_state.as_ref() != Some(&returned_state) {
        tracing::warn!("Shopify OAuth state mismatch");
        return login_failed("invalid_state");
    }

    let token = match state
        .customer()
        .exchange_code(&code, &callback_uri(&state))
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange Shopify OAuth code");
            return login_failed("token_exchange");
        }
    };

    // New privilege level, new session id
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return login_failed("session");
    }

    if let Err(e) = set_shopify_customer_token(&session, &token).await {
        tracing::error!(error = %e, "Failed to store Shopify customer token");
        return login_failed("session");
    }

    tracing::info!("Shopify customer authenticated successfully");

    let return_to: Option<String> = session
        .remove(session_keys::SHOPIFY_RETURN_TO)
        .await
        .ok()
        .flatten();

    Redirect::to(return_to.as_deref().unwrap_or("/")).into_response()
}

/// Logout from Shopify Customer Account.
///
/// Clears the Shopify customer token from the session and, when an ID token
/// is available, redirects to Shopify's logout endpoint.
///
/// # Route
///
/// `POST /auth/shopify/logout`
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    let token = clear_shopify_customer_token(&session).await.ok().flatten();
    clear_sentry_user();

    if let Some(id_token) = token.and_then(|t| t.id_token) {
        let post_logout_uri = format!("{}/", state.config().base_url);
        let logout_url = state.customer().logout_url(&id_token, &post_logout_uri);
        return Redirect::to(&logout_url).into_response();
    }

    Redirect::to("/").into_response()
}
