//! GraphQL documents and response shapes for Shopify Storefront API carts.

use serde::{Deserialize, Serialize};

use crate::shopify::types::{Cart, CartLineInput, CartMutation, CartUserError};

/// Shared selection for every cart-returning operation.
macro_rules! cart_fields {
    () => {
        r"
    fragment CartFields on Cart {
        id
        checkoutUrl
        totalQuantity
    }
"
    };
}

/// `cart(id:)` query.
pub const GET_CART: &str = concat!(
    r"
    query GetCart($cartId: ID!) {
        cart(id: $cartId) {
            ...CartFields
        }
    }
",
    cart_fields!()
);

/// `cartCreate` mutation.
pub const CREATE_CART: &str = concat!(
    r"
    mutation CreateCart($input: CartInput!) {
        cartCreate(input: $input) {
            cart {
                ...CartFields
            }
            userErrors {
                code
                field
                message
            }
        }
    }
",
    cart_fields!()
);

/// `cartLinesAdd` mutation.
pub const ADD_TO_CART: &str = concat!(
    r"
    mutation AddToCart($cartId: ID!, $lines: [CartLineInput!]!) {
        cartLinesAdd(cartId: $cartId, lines: $lines) {
            cart {
                ...CartFields
            }
            userErrors {
                code
                field
                message
            }
        }
    }
",
    cart_fields!()
);

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCartVariables<'a> {
    pub cart_id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateCartVariables {
    pub input: CartInput,
}

#[derive(Debug, Serialize)]
pub struct CartInput {
    pub lines: Vec<CartLineInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartVariables<'a> {
    pub cart_id: &'a str,
    pub lines: Vec<CartLineInput>,
}

// =============================================================================
// Response Data
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartFields {
    pub id: String,
    pub checkout_url: String,
    pub total_quantity: i64,
}

impl From<CartFields> for Cart {
    fn from(fields: CartFields) -> Self {
        Self {
            id: fields.id,
            checkout_url: fields.checkout_url,
            total_quantity: fields.total_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetCartData {
    pub cart: Option<CartFields>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationPayload {
    pub cart: Option<CartFields>,
    #[serde(default)]
    pub user_errors: Vec<CartUserError>,
}

impl From<CartMutationPayload> for CartMutation {
    fn from(payload: CartMutationPayload) -> Self {
        Self {
            cart: payload.cart.map(Cart::from),
            user_errors: payload.user_errors,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartData {
    pub cart_create: Option<CartMutationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartData {
    pub cart_lines_add: Option<CartMutationPayload>,
}
