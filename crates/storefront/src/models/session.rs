//! Session-related types.
//!
//! The session only carries Shopify Customer Account OAuth state; carts live
//! in their own cookie and everything else lives in Shopify.

/// Session keys for authentication data.
pub mod keys {
    /// Key for Shopify OAuth state (CSRF protection).
    pub const SHOPIFY_OAUTH_STATE: &str = "shopify_oauth_state";

    /// Key for Shopify OAuth nonce (`OpenID` Connect replay protection).
    pub const SHOPIFY_OAUTH_NONCE: &str = "shopify_oauth_nonce";

    /// Key for the local path to return to after login.
    pub const SHOPIFY_RETURN_TO: &str = "shopify_return_to";

    /// Key for Shopify customer access token.
    pub const SHOPIFY_CUSTOMER_TOKEN: &str = "shopify_customer_token";
}
