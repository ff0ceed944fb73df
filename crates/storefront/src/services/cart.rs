//! Cart line reconciliation.
//!
//! Turns untrusted "buy again" query strings into Storefront API cart lines
//! and either creates a cart or appends to the visitor's existing one.
//!
//! The visitor's cart is identified by a `cart` cookie holding the token that
//! follows `gid://shopify/Cart/`.

use std::future::Future;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};
use tracing::{instrument, warn};

use bramble_core::{CART_GID_PREFIX, normalize_variant_id};

use crate::shopify::{Cart, CartLineInput, CartMutation, ShopifyError, StorefrontClient};

/// Name of the cookie carrying the cart token.
pub const CART_COOKIE_NAME: &str = "cart";

/// Lifetime of the cart cookie.
const CART_COOKIE_MAX_AGE_DAYS: i64 = 14;

// =============================================================================
// Input Normalization
// =============================================================================

/// Parse a `lines` parameter of the form `variant[:quantity],...`.
///
/// Entries whose variant does not normalize are dropped; order is preserved.
/// A missing, unparsable or non-positive quantity becomes 1.
#[must_use]
pub fn parse_lines(raw: &str) -> Vec<CartLineInput> {
    raw.split(',')
        .filter_map(|entry| {
            let (variant, quantity) = split_entry(entry);
            let variant = normalize_variant_id(variant)?;
            Some(CartLineInput::new(variant, parse_quantity(quantity)))
        })
        .collect()
}

/// Split an entry at its last `:`.
///
/// A prefixed global ID contains `:` itself (`gid://...`), so a tail holding
/// `/` belongs to the ID rather than being a quantity.
fn split_entry(entry: &str) -> (&str, Option<&str>) {
    match entry.rsplit_once(':') {
        Some((variant, quantity)) if !quantity.contains('/') => (variant, Some(quantity)),
        _ => (entry, None),
    }
}

/// Leading ASCII digits of `raw` as a quantity, saturating; 1 when absent or zero.
fn parse_quantity(raw: Option<&str>) -> i64 {
    let quantity = raw
        .map(str::trim)
        .unwrap_or_default()
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0_i64, |acc, digit| {
            acc.saturating_mul(10)
                .saturating_add(i64::from(digit - b'0'))
        });

    quantity.max(1)
}

/// Pick the lines to add from the three supported query parameters.
///
/// Non-empty parsed `lines` win. Otherwise a valid `variant` (then
/// `variant_id`) yields a single line of quantity 1. Otherwise nothing.
#[must_use]
pub fn resolve_lines(
    lines: Option<&str>,
    variant: Option<&str>,
    variant_id: Option<&str>,
) -> Vec<CartLineInput> {
    let parsed = lines.map(parse_lines).unwrap_or_default();
    if !parsed.is_empty() {
        return parsed;
    }

    variant
        .and_then(normalize_variant_id)
        .or_else(|| variant_id.and_then(normalize_variant_id))
        .map(|variant| vec![CartLineInput::new(variant, 1)])
        .unwrap_or_default()
}

// =============================================================================
// Cart Handler
// =============================================================================

/// Access to the visitor's cart.
pub trait CartHandler {
    /// The visitor's current cart, `None` when they have none.
    fn get(&self) -> impl Future<Output = Result<Option<Cart>, ShopifyError>> + Send;

    /// Create a cart holding `lines`.
    fn create(
        &self,
        lines: Vec<CartLineInput>,
    ) -> impl Future<Output = Result<CartMutation, ShopifyError>> + Send;

    /// Append `lines` to the cart `cart_id`.
    fn add_lines(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> impl Future<Output = Result<CartMutation, ShopifyError>> + Send;

    /// Response headers that persist `cart_id` for the visitor.
    fn set_cart_id(&self, cart_id: &str) -> HeaderMap;
}

/// [`CartHandler`] backed by the Storefront API and the `cart` cookie.
pub struct StorefrontCartHandler<'a> {
    client: &'a StorefrontClient,
    cart_id: Option<String>,
    secure: bool,
}

impl<'a> StorefrontCartHandler<'a> {
    /// Build a handler for the cart named by the request's `cart` cookie.
    #[must_use]
    pub fn from_headers(client: &'a StorefrontClient, headers: &HeaderMap, secure: bool) -> Self {
        Self {
            client,
            cart_id: cart_id_from_headers(headers),
            secure,
        }
    }
}

impl CartHandler for StorefrontCartHandler<'_> {
    async fn get(&self) -> Result<Option<Cart>, ShopifyError> {
        match &self.cart_id {
            Some(cart_id) => self.client.get_cart(cart_id).await,
            None => Ok(None),
        }
    }

    async fn create(&self, lines: Vec<CartLineInput>) -> Result<CartMutation, ShopifyError> {
        self.client.create_cart(lines).await
    }

    async fn add_lines(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<CartMutation, ShopifyError> {
        self.client.add_to_cart(cart_id, lines).await
    }

    fn set_cart_id(&self, cart_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let token = cart_id.strip_prefix(CART_GID_PREFIX).unwrap_or(cart_id);

        let cookie = Cookie::build((CART_COOKIE_NAME, token))
            .path("/")
            .same_site(SameSite::Lax)
            .http_only(true)
            .secure(self.secure)
            .max_age(Duration::days(CART_COOKIE_MAX_AGE_DAYS))
            .build();

        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                headers.insert(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Cart id is not a valid cookie value"),
        }

        headers
    }
}

/// Full cart global ID from the `cart` cookie, if present.
fn cart_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == CART_COOKIE_NAME)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.starts_with(CART_GID_PREFIX) {
                token
            } else {
                format!("{CART_GID_PREFIX}{token}")
            }
        })
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Add `lines` to the visitor's cart, creating one if needed.
///
/// Returns the headers to attach to the response: a `Set-Cookie` for the
/// cart when Shopify returned one, nothing otherwise. An empty `lines`
/// performs no cart calls at all.
///
/// # Errors
///
/// Returns the underlying `ShopifyError` if reading or mutating the cart fails.
#[instrument(skip_all, fields(line_count = lines.len()))]
pub async fn reconcile<C: CartHandler>(
    cart: &C,
    lines: Vec<CartLineInput>,
) -> Result<HeaderMap, ShopifyError> {
    if lines.is_empty() {
        return Ok(HeaderMap::new());
    }

    let result = match cart.get().await? {
        Some(existing) => cart.add_lines(&existing.id, lines).await?,
        None => cart.create(lines).await?,
    };

    for error in &result.user_errors {
        warn!(
            code = error.code.as_deref().unwrap_or("UNKNOWN"),
            message = %error.message,
            "Cart mutation returned user error"
        );
    }

    Ok(result
        .cart_id()
        .map(|cart_id| cart.set_cart_id(cart_id))
        .unwrap_or_default())
}

/// In-memory [`CartHandler`] recording every call, for tests.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use axum::http::{HeaderMap, HeaderValue, header::SET_COOKIE};

    use super::CartHandler;
    use crate::shopify::{Cart, CartLineInput, CartMutation, ShopifyError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Call {
        Get,
        Create(Vec<CartLineInput>),
        AddLines(String, Vec<CartLineInput>),
        SetCartId(String),
    }

    pub(crate) struct FakeCart {
        existing: Option<Cart>,
        result: CartMutation,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeCart {
        pub(crate) fn new(existing: Option<Cart>, result: CartMutation) -> Self {
            Self {
                existing,
                result,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl CartHandler for FakeCart {
        async fn get(&self) -> Result<Option<Cart>, ShopifyError> {
            self.record(Call::Get);
            Ok(self.existing.clone())
        }

        async fn create(&self, lines: Vec<CartLineInput>) -> Result<CartMutation, ShopifyError> {
            self.record(Call::Create(lines));
            Ok(self.result.clone())
        }

        async fn add_lines(
            &self,
            cart_id: &str,
            lines: Vec<CartLineInput>,
        ) -> Result<CartMutation, ShopifyError> {
            self.record(Call::AddLines(cart_id.to_string(), lines));
            Ok(self.result.clone())
        }

        fn set_cart_id(&self, cart_id: &str) -> HeaderMap {
            self.record(Call::SetCartId(cart_id.to_string()));
            let mut headers = HeaderMap::new();
            headers.insert(SET_COOKIE, HeaderValue::from_static("cart=fake"));
            headers
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use crate::shopify::CartUserError;

    use super::fake::{Call, FakeCart};
    use super::*;

    fn cart(id: &str) -> Cart {
        Cart {
            id: id.to_string(),
            checkout_url: "https://shop.test/checkout".to_string(),
            total_quantity: 1,
        }
    }

    fn mutation(id: Option<&str>) -> CartMutation {
        CartMutation {
            cart: id.map(cart),
            user_errors: vec![],
        }
    }

    fn line(id: &str, quantity: i64) -> CartLineInput {
        CartLineInput::new(normalize_variant_id(id).unwrap(), quantity)
    }

    // -------------------------------------------------------------------------
    // parse_lines / resolve_lines
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_lines_mixed_entries() {
        let lines = parse_lines("123:2,gid://shopify/ProductVariant/456,bad:5,789:0");
        assert_eq!(
            lines,
            vec![line("123", 2), line("456", 1), line("789", 1)]
        );
    }

    #[test]
    fn test_parse_lines_prefixed_with_quantity() {
        let lines = parse_lines("gid://shopify/ProductVariant/42:3");
        assert_eq!(lines, vec![line("42", 3)]);
    }

    #[test]
    fn test_parse_lines_quantity_edge_cases() {
        assert_eq!(parse_lines("1:abc"), vec![line("1", 1)]);
        assert_eq!(parse_lines("1:2abc"), vec![line("1", 2)]);
        assert_eq!(parse_lines("1:-4"), vec![line("1", 1)]);
        assert_eq!(parse_lines("1:"), vec![line("1", 1)]);
        assert_eq!(
            parse_lines("1:99999999999999999999999"),
            vec![line("1", i64::MAX)]
        );
    }

    #[test]
    fn test_parse_lines_empty_and_blank_entries() {
        assert!(parse_lines("").is_empty());
        assert!(parse_lines(",, ,").is_empty());
        assert_eq!(parse_lines(" 7 : 2 ,"), vec![line("7", 2)]);
    }

    #[test]
    fn test_resolve_lines_prefers_lines() {
        let lines = resolve_lines(Some("1:2"), Some("3"), Some("4"));
        assert_eq!(lines, vec![line("1", 2)]);
    }

    #[test]
    fn test_resolve_lines_falls_back_to_variant_then_variant_id() {
        assert_eq!(resolve_lines(Some("bad"), Some("3"), None), vec![line("3", 1)]);
        assert_eq!(resolve_lines(None, Some("bad"), Some("4")), vec![line("4", 1)]);
        assert_eq!(resolve_lines(None, None, Some("4")), vec![line("4", 1)]);
    }

    #[test]
    fn test_resolve_lines_nothing_valid() {
        assert!(resolve_lines(None, None, None).is_empty());
        assert!(resolve_lines(Some(""), Some(""), Some("x")).is_empty());
    }

    // -------------------------------------------------------------------------
    // reconcile
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_reconcile_creates_cart_when_none_exists() {
        let fake = FakeCart::new(None, mutation(Some("gid://shopify/Cart/new")));

        let headers = reconcile(&fake, resolve_lines(None, Some("123"), None))
            .await
            .unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                Call::Get,
                Call::Create(vec![line("123", 1)]),
                Call::SetCartId("gid://shopify/Cart/new".to_string()),
            ]
        );
        assert!(headers.contains_key(SET_COOKIE));
    }

    #[tokio::test]
    async fn test_reconcile_appends_to_existing_cart() {
        let fake = FakeCart::new(
            Some(cart("gid://shopify/Cart/old")),
            mutation(Some("gid://shopify/Cart/old")),
        );

        reconcile(&fake, vec![line("1", 2)]).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                Call::Get,
                Call::AddLines("gid://shopify/Cart/old".to_string(), vec![line("1", 2)]),
                Call::SetCartId("gid://shopify/Cart/old".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_reconcile_empty_lines_makes_no_calls() {
        let fake = FakeCart::new(None, mutation(Some("gid://shopify/Cart/new")));

        let headers = reconcile(&fake, resolve_lines(Some(""), None, None))
            .await
            .unwrap();

        assert!(fake.calls().is_empty());
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_without_cart_in_result_sets_no_cookie() {
        let fake = FakeCart::new(
            None,
            CartMutation {
                cart: None,
                user_errors: vec![CartUserError {
                    code: Some("INVALID".to_string()),
                    field: None,
                    message: "Merchandise does not exist".to_string(),
                }],
            },
        );

        let headers = reconcile(&fake, vec![line("1", 1)]).await.unwrap();

        assert!(headers.is_empty());
        assert_eq!(fake.calls().len(), 2);
    }

    // -------------------------------------------------------------------------
    // cookie handling
    // -------------------------------------------------------------------------

    #[test]
    fn test_cart_id_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("bramble_session=abc; cart=c1-xyz?key=k"),
        );
        assert_eq!(
            cart_id_from_headers(&headers).as_deref(),
            Some("gid://shopify/Cart/c1-xyz?key=k")
        );
    }

    #[test]
    fn test_cart_id_missing_or_blank() {
        assert!(cart_id_from_headers(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("cart="));
        assert!(cart_id_from_headers(&headers).is_none());
    }

    #[test]
    fn test_set_cart_id_writes_token_cookie() {
        let client = StorefrontClient::new(&crate::config::test_config().shopify);
        let handler = StorefrontCartHandler::from_headers(&client, &HeaderMap::new(), true);

        let headers = handler.set_cart_id("gid://shopify/Cart/c1-xyz");
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();

        assert!(cookie.starts_with("cart=c1-xyz;"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
    }
}
