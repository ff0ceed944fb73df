//! Shopify Storefront API client implementation.
//!
//! Documents live in [`queries`] and travel in `graphql_client` envelopes over
//! `reqwest` 0.13. Carts are never cached: every call reads Shopify.

pub mod queries;

use std::sync::Arc;

use graphql_client::{QueryBody, Response};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{Cart, CartLineInput, CartMutation};
use crate::shopify::{GraphQLError, ShopifyError};

use queries::{
    ADD_TO_CART, AddToCartData, AddToCartVariables, CREATE_CART, CartInput, CreateCartData,
    CreateCartVariables, GET_CART, GetCartData, GetCartVariables,
};

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API.
///
/// Cheap to clone; the HTTP connection pool is shared.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let endpoint = format!(
            "https://{}/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.storefront_private_token.expose_secret().to_string(),
            }),
        }
    }

    /// Execute a GraphQL document.
    async fn execute<V, T>(
        &self,
        operation_name: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<T, ShopifyError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let request_body = QueryBody {
            variables,
            query,
            operation_name,
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            // See: https://shopify.dev/docs/storefronts/headless/building-with-the-storefront-api/getting-started
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                operation = operation_name,
                body = %truncate(&response_text, 500),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                truncate(&response_text, 200)
            ))]));
        }

        let response: Response<T> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    operation = operation_name,
                    body = %truncate(&response_text, 500),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, operation = operation_name, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation = operation_name,
                body = %truncate(&response_text, 500),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get an existing cart.
    ///
    /// Returns `Ok(None)` when Shopify no longer knows the cart (expired or
    /// completed checkout).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &str) -> Result<Option<Cart>, ShopifyError> {
        let data: GetCartData = self
            .execute("GetCart", GET_CART, GetCartVariables { cart_id })
            .await?;

        Ok(data.cart.map(Cart::from))
    }

    /// Create a new cart holding `lines`.
    ///
    /// User errors are returned in the [`CartMutation`], not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is missing.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn create_cart(
        &self,
        lines: Vec<CartLineInput>,
    ) -> Result<CartMutation, ShopifyError> {
        let variables = CreateCartVariables {
            input: CartInput { lines },
        };

        let data: CreateCartData = self
            .execute("CreateCart", CREATE_CART, variables)
            .await?;

        data.cart_create
            .map(CartMutation::from)
            .ok_or_else(|| ShopifyError::GraphQL(vec![GraphQLError::message("Failed to create cart")]))
    }

    /// Append lines to an existing cart.
    ///
    /// User errors are returned in the [`CartMutation`], not as `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the payload is missing.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, line_count = lines.len()))]
    pub async fn add_to_cart(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
    ) -> Result<CartMutation, ShopifyError> {
        let data: AddToCartData = self
            .execute("AddToCart", ADD_TO_CART, AddToCartVariables { cart_id, lines })
            .await?;

        data.cart_lines_add
            .map(CartMutation::from)
            .ok_or_else(|| ShopifyError::GraphQL(vec![GraphQLError::message("Failed to add to cart")]))
    }
}

/// First `max` characters of `text`, for log fields.
fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
