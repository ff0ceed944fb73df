//! Customer notification API.
//!
//! Both endpoints act on the signed-in customer's notification metafield.

use axum::{
    Form, Json,
    extract::{Query, State, rejection::FormRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bramble_core::Notification;

use super::ApiError;
use crate::error::Result;
use crate::middleware::RequireShopifyCustomer;
use crate::middleware::shopify_customer::ShopifyCustomerRejection;
use crate::services::notifications::{
    CustomerNotificationStore, MarkReadOutcome, mark_customer_notification_read,
    sync_customer_notifications, timestamp_now,
};
use crate::state::AppState;

/// Query parameters of the listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Maximum number of notifications to return; ignored unless a positive integer.
    pub limit: Option<String>,
}

impl ListQuery {
    fn limit(&self) -> Option<usize> {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
    }
}

/// Form body of the mark-read endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct MarkReadForm {
    #[serde(rename = "notificationId")]
    pub notification_id: Option<String>,
}

/// Successful mark-read response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadResponse {
    ok: bool,
    notification: Notification,
    unread_count: usize,
}

/// List the customer's notifications after syncing them with their orders.
///
/// # Route
///
/// `GET /api/notifications?limit=N`
///
/// # Errors
///
/// Returns `AppError::Shopify` when the Customer Account API fails.
#[instrument(skip(state, customer))]
pub async fn list(
    State(state): State<AppState>,
    RequireShopifyCustomer(customer): RequireShopifyCustomer,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    let store = CustomerNotificationStore::new(state.customer(), &customer.access_token);
    let list = sync_customer_notifications(&store, query.limit()).await?;
    Ok(Json(list).into_response())
}

/// Mark one notification as read.
///
/// The id is validated before authentication so a malformed request never
/// reaches the store. A body that is not a urlencoded form counts as a
/// missing id.
///
/// # Route
///
/// `POST /api/notifications/read` (form field `notificationId`)
///
/// # Errors
///
/// Returns `AppError::Shopify` when the Customer Account API fails.
#[instrument(skip(state, customer, form))]
pub async fn mark_read(
    State(state): State<AppState>,
    customer: std::result::Result<RequireShopifyCustomer, ShopifyCustomerRejection>,
    form: std::result::Result<Form<MarkReadForm>, FormRejection>,
) -> Result<Response> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let notification_id = form
        .notification_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let Some(notification_id) = notification_id else {
        return Ok(ApiError::new(StatusCode::BAD_REQUEST, "Missing notificationId.").into_response());
    };

    let RequireShopifyCustomer(customer) = match customer {
        Ok(customer) => customer,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let store = CustomerNotificationStore::new(state.customer(), &customer.access_token);
    let outcome =
        mark_customer_notification_read(&store, notification_id, &timestamp_now()).await?;

    Ok(match outcome {
        MarkReadOutcome::Marked {
            notification,
            unread_count,
        } => Json(MarkReadResponse {
            ok: true,
            notification,
            unread_count,
        })
        .into_response(),
        MarkReadOutcome::NotFound => {
            ApiError::new(StatusCode::NOT_FOUND, "Notification not found.").into_response()
        }
    })
}
