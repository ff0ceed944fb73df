//! Cart route handlers.
//!
//! The storefront renders no cart pages itself; "buy again" links land here,
//! get their lines added to the visitor's Shopify cart, and bounce back to the
//! home page with the cart drawer open.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::services::cart::{CartHandler, StorefrontCartHandler, reconcile, resolve_lines};
use crate::state::AppState;

/// Where the visitor lands after a buy-again request.
pub const BUY_AGAIN_REDIRECT: &str = "/?open=cart";

/// Query parameters of a buy-again link.
#[derive(Debug, Default, Deserialize)]
pub struct BuyAgainQuery {
    /// Comma-separated `variant[:quantity]` entries.
    pub lines: Option<String>,
    /// Single variant, quantity 1.
    pub variant: Option<String>,
    /// Alias of `variant`.
    #[serde(rename = "variantId")]
    pub variant_id: Option<String>,
}

/// Add the requested lines to the visitor's cart.
///
/// Always redirects to [`BUY_AGAIN_REDIRECT`] (303), carrying a `Set-Cookie`
/// for the cart when Shopify returned one. Requests without a valid line
/// redirect without touching Shopify.
///
/// # Route
///
/// `GET /cart/buy-again`
///
/// # Errors
///
/// Returns `AppError::Shopify` when reading or mutating the cart fails.
#[instrument(skip(state, headers))]
pub async fn buy_again(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BuyAgainQuery>,
) -> Result<impl IntoResponse> {
    let cart = StorefrontCartHandler::from_headers(
        state.storefront(),
        &headers,
        state.config().is_secure(),
    );
    buy_again_with(&cart, &query).await
}

/// Resolve `query` to cart lines and reconcile them against `cart`.
pub(crate) async fn buy_again_with<C: CartHandler>(
    cart: &C,
    query: &BuyAgainQuery,
) -> Result<(HeaderMap, Redirect)> {
    let lines = resolve_lines(
        query.lines.as_deref(),
        query.variant.as_deref(),
        query.variant_id.as_deref(),
    );

    let line_count = lines.len().to_string();
    add_breadcrumb("cart", "Buy again", Some(&[("lines", line_count.as_str())]));

    let cookies = reconcile(cart, lines).await?;

    Ok((cookies, Redirect::to(BUY_AGAIN_REDIRECT)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header::LOCATION, header::SET_COOKIE},
        routing::get,
    };
    use std::sync::Arc;

    use bramble_core::normalize_variant_id;
    use tower::ServiceExt;

    use super::*;
    use crate::services::cart::fake::{Call, FakeCart};
    use crate::shopify::{Cart, CartLineInput, CartMutation};

    fn app() -> Router {
        Router::new()
            .route("/cart/buy-again", get(buy_again))
            .with_state(crate::state::test_state())
    }

    #[tokio::test]
    async fn test_buy_again_without_valid_lines_redirects() {
        for uri in [
            "/cart/buy-again",
            "/cart/buy-again?lines=",
            "/cart/buy-again?lines=abc,def&variant=xyz",
        ] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers().get(LOCATION).unwrap(), BUY_AGAIN_REDIRECT);
            assert!(response.headers().get(SET_COOKIE).is_none());
        }
    }

    fn fake_app(cart: Arc<FakeCart>) -> Router {
        Router::new().route(
            "/cart/buy-again",
            get(move |Query(query): Query<BuyAgainQuery>| {
                let cart = Arc::clone(&cart);
                async move { buy_again_with(cart.as_ref(), &query).await }
            }),
        )
    }

    fn created(id: &str) -> CartMutation {
        CartMutation {
            cart: Some(Cart {
                id: id.to_string(),
                checkout_url: "https://shop.test/checkout".to_string(),
                total_quantity: 1,
            }),
            user_errors: vec![],
        }
    }

    #[tokio::test]
    async fn test_buy_again_single_variant_creates_cart() {
        let cart = Arc::new(FakeCart::new(None, created("gid://shopify/Cart/new")));

        let response = fake_app(Arc::clone(&cart))
            .oneshot(
                Request::builder()
                    .uri("/cart/buy-again?variant=123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(LOCATION).unwrap(), BUY_AGAIN_REDIRECT);
        assert_eq!(response.headers().get(SET_COOKIE).unwrap(), "cart=fake");
        assert_eq!(
            cart.calls(),
            vec![
                Call::Get,
                Call::Create(vec![CartLineInput::new(
                    normalize_variant_id("123").unwrap(),
                    1
                )]),
                Call::SetCartId("gid://shopify/Cart/new".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_buy_again_invalid_lines_skip_cart() {
        let cart = Arc::new(FakeCart::new(None, created("gid://shopify/Cart/new")));

        let response = fake_app(Arc::clone(&cart))
            .oneshot(
                Request::builder()
                    .uri("/cart/buy-again?lines=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(cart.calls().is_empty());
    }

    #[test]
    fn test_query_accepts_variant_id_alias() {
        let query: BuyAgainQuery =
            parse_query("variantId=gid%3A%2F%2Fshopify%2FProductVariant%2F9");
        assert_eq!(
            query.variant_id.as_deref(),
            Some("gid://shopify/ProductVariant/9")
        );
        assert!(query.lines.is_none());
    }

    fn parse_query(raw: &str) -> BuyAgainQuery {
        let uri: axum::http::Uri = format!("/cart/buy-again?{raw}").parse().unwrap();
        Query::<BuyAgainQuery>::try_from_uri(&uri).unwrap().0
    }
}
