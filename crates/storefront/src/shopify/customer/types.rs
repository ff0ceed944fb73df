//! Types for Shopify Customer Account API OAuth and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bramble_core::FulfillmentStatus;

// ─────────────────────────────────────────────────────────────────────────────
// OAuth Types
// ─────────────────────────────────────────────────────────────────────────────

/// Customer access token obtained via OAuth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerAccessToken {
    /// The access token for API requests.
    pub access_token: String,
    /// The ID token (`OpenID` Connect).
    pub id_token: Option<String>,
    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl CustomerAccessToken {
    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_in.is_some_and(|expires_in| {
            let now = Utc::now().timestamp();
            let expires_at = self.obtained_at + expires_in;
            now >= (expires_at - 60)
        })
    }
}

/// Raw token response from Shopify OAuth endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

impl From<TokenResponse> for CustomerAccessToken {
    fn from(response: TokenResponse) -> Self {
        Self {
            access_token: response.access_token,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            obtained_at: Utc::now().timestamp(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders
// ─────────────────────────────────────────────────────────────────────────────

/// The slice of a customer order that notifications are derived from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// The order global ID.
    pub id: String,
    /// The order name (e.g., "#1001").
    pub name: String,
    /// When the order was processed (RFC 3339).
    pub processed_at: String,
    /// The fulfillment status, when Shopify reports one.
    pub fulfillment_status: Option<FulfillmentStatus>,
}

impl OrderSummary {
    /// Parse the `processed_at` timestamp.
    #[must_use]
    pub fn processed_at_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.processed_at)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metafields
// ─────────────────────────────────────────────────────────────────────────────

/// The customer's stored notification metafield.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotifications {
    /// Customer global ID, the metafield owner.
    pub owner_id: String,
    /// Raw JSON value, `None` when the metafield was never written.
    pub value: Option<String>,
}

/// Input for `metafieldsSet`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MetafieldsSetInput<'a> {
    pub owner_id: &'a str,
    pub namespace: &'a str,
    pub key: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub value: &'a str,
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// User error from a mutation.
#[derive(Debug, Deserialize)]
pub(super) struct CustomerUserError {
    pub message: String,
}
