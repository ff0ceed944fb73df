//! Order status enums.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Maps to the fulfillment status values returned by Shopify's Customer
/// Account API. Values this crate does not know about deserialize to
/// [`FulfillmentStatus::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentStatus {
    #[default]
    Unfulfilled,
    PartiallyFulfilled,
    Fulfilled,
    Restocked,
    PendingFulfillment,
    Open,
    InProgress,
    OnHold,
    Scheduled,
    #[serde(other)]
    Other,
}

impl FulfillmentStatus {
    /// The Shopify enum name, as used in stable identifiers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unfulfilled => "UNFULFILLED",
            Self::PartiallyFulfilled => "PARTIALLY_FULFILLED",
            Self::Fulfilled => "FULFILLED",
            Self::Restocked => "RESTOCKED",
            Self::PendingFulfillment => "PENDING_FULFILLMENT",
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::OnHold => "ON_HOLD",
            Self::Scheduled => "SCHEDULED",
            Self::Other => "OTHER",
        }
    }

    /// Short customer-facing description.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unfulfilled | Self::Open | Self::PendingFulfillment => "being prepared",
            Self::PartiallyFulfilled => "partially shipped",
            Self::Fulfilled => "on its way",
            Self::Restocked => "cancelled and restocked",
            Self::InProgress => "being packed",
            Self::OnHold => "on hold",
            Self::Scheduled => "scheduled",
            Self::Other => "updated",
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
