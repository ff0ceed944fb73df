//! Shopify Customer Account API client.
//!
//! The Customer Account API provides customer-scoped access after an OAuth
//! 2.0 login. This storefront uses it for three things: signing customers in,
//! listing their recent orders, and reading and writing the
//! `custom.notifications` customer metafield.
//!
//! # OAuth Flow
//!
//! 1. Generate authorization URL with `authorization_url()`
//! 2. Redirect customer to Shopify's login page
//! 3. Shopify redirects back with authorization code
//! 4. Exchange code for tokens with `exchange_code()`
//! 5. Use access token for customer-scoped API calls

mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::ShopifyError;

/// Metafield namespace holding the notification list.
pub const NOTIFICATIONS_NAMESPACE: &str = "custom";
/// Metafield key holding the notification list.
pub const NOTIFICATIONS_KEY: &str = "notifications";

// ─────────────────────────────────────────────────────────────────────────────
// GraphQL Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GraphQLRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
}

impl<T> GraphQLResponse<T> {
    fn into_result(self) -> Result<T, ShopifyError> {
        if let Some(errors) = self.errors
            && !errors.is_empty()
        {
            let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(ShopifyError::OAuth(messages.join("; ")));
        }

        self.data
            .ok_or_else(|| ShopifyError::OAuth("No data in response".to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Customer Account Client
// ─────────────────────────────────────────────────────────────────────────────

/// Client for the Shopify Customer Account API.
///
/// Recent orders are cached per access token for 5 minutes; metafield reads
/// always go to Shopify.
#[derive(Clone)]
pub struct CustomerClient {
    inner: Arc<CustomerClientInner>,
}

struct CustomerClientInner {
    client: reqwest::Client,
    store_id: String,
    api_version: String,
    client_id: String,
    client_secret: String,
    orders: Cache<String, Arc<Vec<OrderSummary>>>,
}

impl CustomerClient {
    /// Create a new Customer Account API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let orders = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CustomerClientInner {
                client: reqwest::Client::new(),
                store_id: config.customer_shop_id.clone(),
                api_version: config.api_version.clone(),
                client_id: config.customer_client_id.clone(),
                client_secret: config.customer_client_secret.expose_secret().to_string(),
                orders,
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // OAuth Flow
    // ─────────────────────────────────────────────────────────────────────────

    /// Generate the authorization URL for customer login.
    ///
    /// # Arguments
    ///
    /// * `redirect_uri` - The callback URL to redirect to after authentication
    /// * `state` - A random string stored in the session to prevent CSRF attacks
    /// * `nonce` - A random string for `OpenID` Connect replay protection
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str, nonce: &str) -> String {
        format!(
            "https://shopify.com/{}/auth/oauth/authorize?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope=openid%20email%20customer-account-api:full&\
            state={}&\
            nonce={}",
            self.inner.store_id,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
            urlencoding::encode(nonce)
        )
    }

    /// Generate the logout URL.
    #[must_use]
    pub fn logout_url(&self, id_token: &str, post_logout_redirect_uri: &str) -> String {
        format!(
            "https://shopify.com/{}/auth/oauth/logout?\
            id_token_hint={}&\
            post_logout_redirect_uri={}",
            self.inner.store_id,
            urlencoding::encode(id_token),
            urlencoding::encode(post_logout_redirect_uri)
        )
    }

    /// Exchange an authorization code for access tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    #[instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<CustomerAccessToken, ShopifyError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        self.token_request(&params, "Token exchange failed").await
    }

    /// Refresh an access token using a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token refresh fails.
    #[instrument(skip_all)]
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<CustomerAccessToken, ShopifyError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];

        self.token_request(&params, "Token refresh failed").await
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        failure: &str,
    ) -> Result<CustomerAccessToken, ShopifyError> {
        let url = format!(
            "https://shopify.com/{}/auth/oauth/token",
            self.inner.store_id
        );

        let response = self.inner.client.post(&url).form(params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::OAuth(format!("{failure}: {text}")));
        }

        let token_response: TokenResponse = response.json().await?;
        Ok(token_response.into())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // GraphQL Execution
    // ─────────────────────────────────────────────────────────────────────────

    /// Execute a GraphQL query against the Customer Account API.
    async fn query<T: DeserializeOwned>(
        &self,
        access_token: &str,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<T, ShopifyError> {
        let url = format!(
            "https://shopify.com/{}/account/customer/api/{}/graphql",
            self.inner.store_id, self.inner.api_version
        );

        let request = GraphQLRequest { query, variables };

        let response = self
            .inner
            .client
            .post(&url)
            .header("Authorization", access_token)
            .header("Content-Type", "application/json")
            .header("User-Agent", "Bramble/1.0")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ShopifyError::OAuth(format!(
                "Customer API request failed ({status}): {text}"
            )));
        }

        let gql_response: GraphQLResponse<T> = response.json().await?;
        gql_response.into_result()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Order Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the customer's most recent orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, access_token))]
    pub async fn get_orders(
        &self,
        access_token: &str,
        first: u32,
    ) -> Result<Arc<Vec<OrderSummary>>, ShopifyError> {
        #[derive(Deserialize)]
        struct Response {
            customer: CustomerWithOrders,
        }

        #[derive(Deserialize)]
        struct CustomerWithOrders {
            orders: OrderConnection,
        }

        #[derive(Deserialize)]
        struct OrderConnection {
            edges: Vec<OrderEdge>,
        }

        #[derive(Deserialize)]
        struct OrderEdge {
            node: OrderSummary,
        }

        const QUERY: &str = r"
            query getOrders($first: Int!) {
                customer {
                    orders(first: $first, sortKey: PROCESSED_AT, reverse: true) {
                        edges {
                            node {
                                id
                                name
                                processedAt
                                fulfillmentStatus
                            }
                        }
                    }
                }
            }
        ";

        let cache_key = format!("{first}:{access_token}");
        if let Some(orders) = self.inner.orders.get(&cache_key).await {
            debug!("Cache hit for orders");
            return Ok(orders);
        }

        let variables = serde_json::json!({ "first": first });
        let response: Response = self.query(access_token, QUERY, Some(variables)).await?;

        let orders: Arc<Vec<OrderSummary>> = Arc::new(
            response
                .customer
                .orders
                .edges
                .into_iter()
                .map(|e| e.node)
                .collect(),
        );

        self.inner.orders.insert(cache_key, Arc::clone(&orders)).await;

        Ok(orders)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notification Metafield
    // ─────────────────────────────────────────────────────────────────────────

    /// Read the customer's `custom.notifications` metafield.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn get_notifications_metafield(
        &self,
        access_token: &str,
    ) -> Result<StoredNotifications, ShopifyError> {
        #[derive(Deserialize)]
        struct Response {
            customer: CustomerWithMetafield,
        }

        #[derive(Deserialize)]
        struct CustomerWithMetafield {
            id: String,
            metafield: Option<Metafield>,
        }

        #[derive(Deserialize)]
        struct Metafield {
            value: Option<String>,
        }

        const QUERY: &str = r"
            query getNotifications($namespace: String!, $key: String!) {
                customer {
                    id
                    metafield(namespace: $namespace, key: $key) {
                        value
                    }
                }
            }
        ";

        let variables = serde_json::json!({
            "namespace": NOTIFICATIONS_NAMESPACE,
            "key": NOTIFICATIONS_KEY,
        });
        let response: Response = self.query(access_token, QUERY, Some(variables)).await?;

        Ok(StoredNotifications {
            owner_id: response.customer.id,
            value: response.customer.metafield.and_then(|m| m.value),
        })
    }

    /// Overwrite the customer's `custom.notifications` metafield with `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or if there are validation errors.
    #[instrument(skip(self, access_token, value), fields(owner_id = %owner_id))]
    pub async fn set_notifications_metafield(
        &self,
        access_token: &str,
        owner_id: &str,
        value: &str,
    ) -> Result<(), ShopifyError> {
        #[derive(Deserialize)]
        struct Response {
            #[serde(rename = "metafieldsSet")]
            metafields_set: MetafieldsSetResult,
        }

        #[derive(Deserialize)]
        struct MetafieldsSetResult {
            #[serde(rename = "userErrors")]
            user_errors: Vec<CustomerUserError>,
        }

        const QUERY: &str = r"
            mutation setNotifications($metafields: [MetafieldsSetInput!]!) {
                metafieldsSet(metafields: $metafields) {
                    userErrors {
                        field
                        message
                        code
                    }
                }
            }
        ";

        let input = MetafieldsSetInput {
            owner_id,
            namespace: NOTIFICATIONS_NAMESPACE,
            key: NOTIFICATIONS_KEY,
            kind: "json",
            value,
        };
        let variables = serde_json::json!({ "metafields": [input] });
        let response: Response = self.query(access_token, QUERY, Some(variables)).await?;

        if !response.metafields_set.user_errors.is_empty() {
            let messages: Vec<_> = response
                .metafields_set
                .user_errors
                .iter()
                .map(|e| e.message.as_str())
                .collect();
            return Err(ShopifyError::UserError(messages.join(", ")));
        }

        Ok(())
    }
}
