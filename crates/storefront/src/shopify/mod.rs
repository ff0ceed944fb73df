//! Shopify Storefront and Customer Account API clients.
//!
//! # Architecture
//!
//! - GraphQL documents are plain strings sent through `graphql_client`'s
//!   request/response envelopes over `reqwest`
//! - Shopify is source of truth - carts and notifications are never stored locally
//!
//! # APIs
//!
//! ## Storefront API
//! - Cart reads and mutations (`cart`, `cartCreate`, `cartLinesAdd`)
//! - Private access token, server-side only
//!
//! ## Customer Account API
//! - OAuth authentication flow
//! - Recent orders and the `custom.notifications` customer metafield

mod customer;
mod storefront;
pub mod types;

pub use customer::*;
pub use storefront::StorefrontClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify APIs.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// Customer Account API or OAuth failure.
    #[error("Customer account error: {0}")]
    OAuth(String),
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

impl GraphQLError {
    /// An error carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(e: graphql_client::Error) -> Self {
        Self {
            message: e.message,
            locations: e.locations.map_or_else(Vec::new, |locs| {
                locs.into_iter()
                    .map(|l| GraphQLErrorLocation {
                        line: i64::from(l.line),
                        column: i64::from(l.column),
                    })
                    .collect()
            }),
            path: e.path.map_or_else(Vec::new, |p| {
                p.into_iter()
                    .map(|fragment| match fragment {
                        graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                        graphql_client::PathFragment::Index(i) => {
                            serde_json::Value::Number(i.into())
                        }
                    })
                    .collect()
            }),
        }
    }
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}
