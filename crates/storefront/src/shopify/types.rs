//! Domain types for Shopify Storefront API cart operations.
//!
//! These are the crate's own types, decoupled from the GraphQL documents in
//! `storefront::queries` so services and tests never touch wire shapes.

use serde::{Deserialize, Serialize};

use bramble_core::VariantGid;

// =============================================================================
// Cart Types
// =============================================================================

/// A shopping cart, reduced to what the storefront server reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart global ID (`gid://shopify/Cart/...`).
    pub id: String,
    /// Checkout URL.
    pub checkout_url: String,
    /// Total item quantity.
    pub total_quantity: i64,
}

/// Input for adding a line to cart.
///
/// Serializes straight into Storefront API `CartLineInput` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    /// Product variant global ID.
    pub merchandise_id: String,
    /// Quantity to add (at least 1).
    pub quantity: i64,
}

impl CartLineInput {
    /// A plain line for a normalized variant.
    #[must_use]
    pub fn new(variant: VariantGid, quantity: i64) -> Self {
        Self {
            merchandise_id: variant.into_inner(),
            quantity,
        }
    }
}

/// User error from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartUserError {
    /// Error code.
    pub code: Option<String>,
    /// Field path that caused the error.
    pub field: Option<Vec<String>>,
    /// Human-readable error message.
    pub message: String,
}

/// Result of `cartCreate` / `cartLinesAdd`.
///
/// Shopify reports invalid input as user errors next to a possibly-null cart
/// rather than as a failed request, so both are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartMutation {
    /// The cart after the mutation, if Shopify returned one.
    pub cart: Option<Cart>,
    /// User errors reported by the mutation.
    pub user_errors: Vec<CartUserError>,
}

impl CartMutation {
    /// ID of the resulting cart, if any.
    #[must_use]
    pub fn cart_id(&self) -> Option<&str> {
        self.cart.as_ref().map(|cart| cart.id.as_str())
    }
}
