//! Customer notification synchronization.
//!
//! Notifications live in the customer's `custom.notifications` metafield as a
//! JSON array. Each sync reads that array, validates it, merges in
//! notifications derived from the customer's recent orders and writes the
//! result back when it changed. Writes are last-writer-wins.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{instrument, warn};

use bramble_core::{
    FulfillmentStatus, Notification, NotificationParse, NotificationType, get_unread_count,
    merge_notifications, try_parse_notifications,
};

use crate::shopify::{CustomerClient, OrderSummary, ShopifyError};

/// Maximum number of notifications kept in the metafield.
pub const MAX_STORED_NOTIFICATIONS: usize = 50;

/// Number of recent orders notifications are derived from.
pub const ORDER_LOOKBACK: u32 = 10;

// =============================================================================
// Store
// =============================================================================

/// Persistence for one customer's notifications.
pub trait NotificationStore {
    /// The raw stored payload, `None` when nothing was ever stored.
    fn read(&self) -> impl Future<Output = Result<Option<String>, ShopifyError>> + Send;

    /// Replace the stored payload.
    fn write(&self, value: String) -> impl Future<Output = Result<(), ShopifyError>> + Send;

    /// The customer's newest `count` orders.
    fn recent_orders(
        &self,
        count: u32,
    ) -> impl Future<Output = Result<Vec<OrderSummary>, ShopifyError>> + Send;
}

/// [`NotificationStore`] backed by the Customer Account API metafield.
pub struct CustomerNotificationStore<'a> {
    client: &'a CustomerClient,
    access_token: &'a str,
    owner_id: OnceLock<String>,
}

impl<'a> CustomerNotificationStore<'a> {
    /// Store for the customer owning `access_token`.
    #[must_use]
    pub const fn new(client: &'a CustomerClient, access_token: &'a str) -> Self {
        Self {
            client,
            access_token,
            owner_id: OnceLock::new(),
        }
    }
}

impl NotificationStore for CustomerNotificationStore<'_> {
    async fn read(&self) -> Result<Option<String>, ShopifyError> {
        let stored = self
            .client
            .get_notifications_metafield(self.access_token)
            .await?;
        let _ = self.owner_id.set(stored.owner_id);
        Ok(stored.value)
    }

    async fn write(&self, value: String) -> Result<(), ShopifyError> {
        let owner_id = match self.owner_id.get() {
            Some(id) => id.clone(),
            None => {
                self.client
                    .get_notifications_metafield(self.access_token)
                    .await?
                    .owner_id
            }
        };

        self.client
            .set_notifications_metafield(self.access_token, &owner_id, &value)
            .await
    }

    async fn recent_orders(&self, count: u32) -> Result<Vec<OrderSummary>, ShopifyError> {
        let orders = self.client.get_orders(self.access_token, count).await?;
        Ok(Arc::unwrap_or_clone(orders))
    }
}

// =============================================================================
// Results
// =============================================================================

/// Response body of a notification listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub ok: bool,
    pub notifications: Vec<Notification>,
    /// Unread records across the whole stored list, not just the returned page.
    pub unread_count: usize,
}

/// Outcome of marking a notification as read.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkReadOutcome {
    /// The notification is now read.
    Marked {
        notification: Notification,
        unread_count: usize,
    },
    /// No stored notification has that id.
    NotFound,
}

// =============================================================================
// Derivation
// =============================================================================

/// Notifications implied by the customer's orders.
///
/// Each order with a fulfillment status yields an `order_status` record keyed
/// by order and status, so every status change produces a new notification.
/// A fulfilled order also yields a single `leave_review` record. New records
/// are stamped `now`; records already stored keep their original fields when
/// merged.
#[must_use]
pub fn derive_order_notifications(orders: &[OrderSummary], now: &str) -> Vec<Notification> {
    let mut derived = Vec::new();

    for order in orders {
        let Some(status) = order.fulfillment_status else {
            continue;
        };

        derived.push(Notification {
            id: format!("order_status:{}:{}", order.id, status.as_str()),
            kind: NotificationType::OrderStatus,
            title: format!("Order {} update", order.name),
            message: format!("Your order {} is {}.", order.name, status.label()),
            created_at: now.to_string(),
            read_at: None,
            href: Some(order_href(&order.id)),
            payload: Some(order_payload(order, Some(status))),
        });

        if status == FulfillmentStatus::Fulfilled {
            derived.push(Notification {
                id: format!("leave_review:{}", order.id),
                kind: NotificationType::LeaveReview,
                title: "How did we do?".to_string(),
                message: format!("Leave a review for the items in order {}.", order.name),
                created_at: now.to_string(),
                read_at: None,
                href: Some(format!("{}#review", order_href(&order.id))),
                payload: Some(order_payload(order, None)),
            });
        }
    }

    derived
}

/// Account page for an order, addressed by the numeric tail of its global ID.
fn order_href(order_id: &str) -> String {
    let tail = order_id.rsplit('/').next().unwrap_or(order_id);
    format!("/account/orders/{}", urlencoding::encode(tail))
}

fn order_payload(order: &OrderSummary, status: Option<FulfillmentStatus>) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("orderId".to_string(), Value::String(order.id.clone()));
    payload.insert("orderName".to_string(), Value::String(order.name.clone()));
    if let Some(status) = status {
        payload.insert(
            "status".to_string(),
            Value::String(status.as_str().to_string()),
        );
    }
    payload
}

/// Current time in the format stored in `createdAt` / `readAt`.
#[must_use]
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// Operations
// =============================================================================

/// Read, validate, merge and persist the customer's notifications.
///
/// `limit` caps the returned list; the stored list is never truncated below
/// [`MAX_STORED_NOTIFICATIONS`]. The store is written only when the merged
/// list differs from what was read, or when the stored payload was corrupt.
///
/// # Errors
///
/// Returns the store's `ShopifyError` if reading orders or the metafield, or
/// writing it back, fails.
#[instrument(skip(store))]
pub async fn sync_customer_notifications<S: NotificationStore>(
    store: &S,
    limit: Option<usize>,
) -> Result<NotificationList, ShopifyError> {
    let raw = store.read().await?;
    let parsed = try_parse_notifications(raw.as_deref());
    let malformed = parsed.is_malformed();
    if malformed {
        warn!("Stored notifications are malformed, rebuilding");
    }
    let existing = parsed.into_notifications();

    let orders = store.recent_orders(ORDER_LOOKBACK).await?;
    let derived = derive_order_notifications(&orders, &timestamp_now());

    let merged = merge_notifications(existing.clone(), derived, MAX_STORED_NOTIFICATIONS);
    if malformed || merged != existing {
        store.write(serde_json::to_string(&merged)?).await?;
    }

    let unread_count = get_unread_count(&merged);
    let mut notifications = merged;
    if let Some(limit) = limit {
        notifications.truncate(limit);
    }

    Ok(NotificationList {
        ok: true,
        notifications,
        unread_count,
    })
}

/// Mark the notification `notification_id` as read at `read_at`.
///
/// Only the first record with that id is touched. Already-read records keep
/// their original `readAt` and are not written back.
///
/// # Errors
///
/// Returns the store's `ShopifyError` if reading or writing fails.
#[instrument(skip(store, read_at))]
pub async fn mark_customer_notification_read<S: NotificationStore>(
    store: &S,
    notification_id: &str,
    read_at: &str,
) -> Result<MarkReadOutcome, ShopifyError> {
    let raw = store.read().await?;
    let mut notifications = match try_parse_notifications(raw.as_deref()) {
        NotificationParse::Parsed(list) => list,
        NotificationParse::Malformed => {
            warn!("Stored notifications are malformed");
            Vec::new()
        }
    };

    let Some(notification) = notifications
        .iter_mut()
        .find(|n| n.id == notification_id)
    else {
        return Ok(MarkReadOutcome::NotFound);
    };

    let changed = notification.mark_read(read_at);
    let notification = notification.clone();

    if changed {
        store.write(serde_json::to_string(&notifications)?).await?;
    }

    Ok(MarkReadOutcome::Marked {
        notification,
        unread_count: get_unread_count(&notifications),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Mutex;

    use bramble_core::parse_notifications;
    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        stored: Mutex<Option<String>>,
        orders: Vec<OrderSummary>,
        writes: Mutex<usize>,
    }

    impl FakeStore {
        fn with(stored: Option<Value>, orders: Vec<OrderSummary>) -> Self {
            Self {
                stored: Mutex::new(stored.map(|v| v.to_string())),
                orders,
                writes: Mutex::new(0),
            }
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn stored(&self) -> Vec<Notification> {
            parse_notifications(self.stored.lock().unwrap().as_deref())
        }
    }

    impl NotificationStore for FakeStore {
        async fn read(&self) -> Result<Option<String>, ShopifyError> {
            Ok(self.stored.lock().unwrap().clone())
        }

        async fn write(&self, value: String) -> Result<(), ShopifyError> {
            *self.stored.lock().unwrap() = Some(value);
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }

        async fn recent_orders(&self, count: u32) -> Result<Vec<OrderSummary>, ShopifyError> {
            Ok(self.orders.iter().take(usize::try_from(count).unwrap()).cloned().collect())
        }
    }

    fn record(id: &str, created_at: &str, read_at: Option<&str>) -> Value {
        json!({
            "id": id,
            "type": "discount",
            "title": "10% off",
            "message": "Use code BRAMBLE10",
            "createdAt": created_at,
            "readAt": read_at,
        })
    }

    fn order(id: &str, status: Option<FulfillmentStatus>) -> OrderSummary {
        OrderSummary {
            id: format!("gid://shopify/Order/{id}"),
            name: format!("#{id}"),
            processed_at: "2026-01-01T00:00:00Z".to_string(),
            fulfillment_status: status,
        }
    }

    // -------------------------------------------------------------------------
    // derive_order_notifications
    // -------------------------------------------------------------------------

    #[test]
    fn test_derive_fulfilled_order_adds_review() {
        let derived = derive_order_notifications(
            &[order("1001", Some(FulfillmentStatus::Fulfilled))],
            "2026-02-01T00:00:00.000Z",
        );

        let ids: Vec<_> = derived.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "order_status:gid://shopify/Order/1001:FULFILLED",
                "leave_review:gid://shopify/Order/1001",
            ]
        );
        assert_eq!(derived[0].kind, NotificationType::OrderStatus);
        assert_eq!(derived[0].href.as_deref(), Some("/account/orders/1001"));
        assert_eq!(derived[1].kind, NotificationType::LeaveReview);
        assert!(derived.iter().all(Notification::is_unread));
    }

    #[test]
    fn test_derive_skips_orders_without_status() {
        let derived = derive_order_notifications(
            &[
                order("1", None),
                order("2", Some(FulfillmentStatus::InProgress)),
            ],
            "2026-02-01T00:00:00.000Z",
        );
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].payload.as_ref().unwrap()["status"], "IN_PROGRESS");
    }

    // -------------------------------------------------------------------------
    // sync_customer_notifications
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sync_drops_invalid_records_and_counts_unread() {
        let store = FakeStore::with(
            Some(json!([
                record("a", "2026-01-03", None),
                record("b", "2026-01-02", Some("2026-01-04")),
                {"id": "c", "type": "unknown", "title": "t", "message": "m", "createdAt": "2026-01-01"},
                {"id": "", "type": "discount", "title": "t", "message": "m", "createdAt": "2026-01-01"},
                "not an object",
            ])),
            vec![],
        );

        let list = sync_customer_notifications(&store, None).await.unwrap();

        assert!(list.ok);
        assert_eq!(list.notifications.len(), 2);
        assert_eq!(list.unread_count, 1);
        // Valid records unchanged, nothing to write back.
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_sync_absent_payload_with_no_orders() {
        let store = FakeStore::default();

        let list = sync_customer_notifications(&store, None).await.unwrap();

        assert!(list.notifications.is_empty());
        assert_eq!(list.unread_count, 0);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_sync_rewrites_malformed_payload() {
        let store = FakeStore {
            stored: Mutex::new(Some("{not json".to_string())),
            ..FakeStore::default()
        };

        let list = sync_customer_notifications(&store, None).await.unwrap();

        assert!(list.notifications.is_empty());
        assert_eq!(store.writes(), 1);
        assert_eq!(store.stored.lock().unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_sync_merges_derived_and_persists() {
        let store = FakeStore::with(
            Some(json!([record("a", "2026-01-03", None)])),
            vec![order("7", Some(FulfillmentStatus::Fulfilled))],
        );

        let list = sync_customer_notifications(&store, None).await.unwrap();

        assert_eq!(list.notifications.len(), 3);
        assert_eq!(list.unread_count, 3);
        assert_eq!(store.writes(), 1);
        assert_eq!(store.stored().len(), 3);

        // Second sync finds nothing new.
        sync_customer_notifications(&store, None).await.unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_sync_keeps_stored_read_state_over_derived() {
        let id = "order_status:gid://shopify/Order/7:FULFILLED";
        let stored = json!([{
            "id": id,
            "type": "order_status",
            "title": "Order #7 update",
            "message": "Your order #7 is on its way.",
            "createdAt": "2026-01-05T00:00:00.000Z",
            "readAt": "2026-01-06T00:00:00.000Z",
        }]);
        let store = FakeStore::with(
            Some(stored),
            vec![order("7", Some(FulfillmentStatus::Fulfilled))],
        );

        let list = sync_customer_notifications(&store, None).await.unwrap();

        let status = list.notifications.iter().find(|n| n.id == id).unwrap();
        assert_eq!(status.read_at.as_deref(), Some("2026-01-06T00:00:00.000Z"));
        // Only the review record is new.
        assert_eq!(list.unread_count, 1);
    }

    #[tokio::test]
    async fn test_sync_limit_truncates_response_only() {
        let store = FakeStore::with(
            Some(json!([
                record("a", "2026-01-03", None),
                record("b", "2026-01-02", None),
                record("c", "2026-01-01", None),
            ])),
            vec![],
        );

        let list = sync_customer_notifications(&store, Some(2)).await.unwrap();

        let ids: Vec<_> = list.notifications.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(list.unread_count, 3);
        assert_eq!(store.stored().len(), 3);
    }

    #[tokio::test]
    async fn test_sync_dedupes_stored_duplicates() {
        let store = FakeStore::with(
            Some(json!([
                record("a", "2026-01-03", Some("2026-01-04")),
                record("a", "2026-01-03", None),
            ])),
            vec![],
        );

        let list = sync_customer_notifications(&store, None).await.unwrap();

        assert_eq!(list.notifications.len(), 1);
        assert_eq!(list.unread_count, 0);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_sync_at_capacity_never_resurrects_read_order_records() {
        let read_at = Some("2026-01-02T00:00:00.000Z");
        let mut stored: Vec<Value> = (0..48)
            .map(|i| record(&format!("discount:{i}"), &format!("2026-01-01T00:{i:02}:00Z"), read_at))
            .collect();
        for id in [
            "order_status:gid://shopify/Order/7:FULFILLED",
            "leave_review:gid://shopify/Order/7",
        ] {
            stored.push(json!({
                "id": id,
                "type": "order_status",
                "title": "Order #7 update",
                "message": "Your order #7 is fulfilled.",
                "createdAt": "2025-12-01T00:00:00.000Z",
                "readAt": read_at,
            }));
        }
        let store = FakeStore::with(
            Some(Value::Array(stored)),
            vec![
                order("8", Some(FulfillmentStatus::Fulfilled)),
                order("7", Some(FulfillmentStatus::Fulfilled)),
            ],
        );

        for _ in 0..3 {
            let list = sync_customer_notifications(&store, None).await.unwrap();
            assert_eq!(list.notifications.len(), MAX_STORED_NOTIFICATIONS);
            assert_eq!(list.unread_count, 2);
        }

        let stored = store.stored();
        let order7: Vec<_> = stored
            .iter()
            .filter(|n| n.id.contains("Order/7"))
            .collect();
        assert_eq!(order7.len(), 2);
        assert!(order7.iter().all(|n| !n.is_unread()));
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_list_serializes_camel_case() {
        let list = NotificationList {
            ok: true,
            notifications: vec![],
            unread_count: 4,
        };
        assert_eq!(
            serde_json::to_value(&list).unwrap(),
            json!({"ok": true, "notifications": [], "unreadCount": 4})
        );
    }

    // -------------------------------------------------------------------------
    // mark_customer_notification_read
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_mark_read_sets_read_at_and_persists() {
        let store = FakeStore::with(
            Some(json!([
                record("a", "2026-01-03", None),
                record("b", "2026-01-02", None),
            ])),
            vec![],
        );

        let outcome = mark_customer_notification_read(&store, "b", "2026-02-01T00:00:00.000Z")
            .await
            .unwrap();

        let MarkReadOutcome::Marked {
            notification,
            unread_count,
        } = outcome
        else {
            panic!("expected Marked");
        };
        assert_eq!(notification.id, "b");
        assert_eq!(notification.read_at.as_deref(), Some("2026-02-01T00:00:00.000Z"));
        assert_eq!(unread_count, 1);
        assert_eq!(store.writes(), 1);
        assert_eq!(
            store.stored()[1].read_at.as_deref(),
            Some("2026-02-01T00:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_mark_read_already_read_is_not_rewritten() {
        let store = FakeStore::with(
            Some(json!([record("a", "2026-01-03", Some("2026-01-04"))])),
            vec![],
        );

        let outcome = mark_customer_notification_read(&store, "a", "2026-02-01")
            .await
            .unwrap();

        match outcome {
            MarkReadOutcome::Marked { notification, .. } => {
                assert_eq!(notification.read_at.as_deref(), Some("2026-01-04"));
            }
            MarkReadOutcome::NotFound => panic!("expected Marked"),
        }
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_unknown_id_leaves_store_untouched() {
        let store = FakeStore::with(Some(json!([record("a", "2026-01-03", None)])), vec![]);

        let outcome = mark_customer_notification_read(&store, "zzz", "2026-02-01")
            .await
            .unwrap();

        assert_eq!(outcome, MarkReadOutcome::NotFound);
        assert_eq!(store.writes(), 0);
        assert!(store.stored()[0].is_unread());
    }

    #[tokio::test]
    async fn test_mark_read_first_duplicate_only() {
        let store = FakeStore::with(
            Some(json!([
                record("a", "2026-01-03", None),
                record("a", "2026-01-02", None),
            ])),
            vec![],
        );

        mark_customer_notification_read(&store, "a", "2026-02-01")
            .await
            .unwrap();

        let stored = store.stored();
        assert!(!stored[0].is_unread());
        assert!(stored[1].is_unread());
    }

    #[test]
    fn test_timestamp_now_is_rfc3339() {
        let now = timestamp_now();
        assert!(chrono::DateTime::parse_from_rfc3339(&now).is_ok());
        assert!(now.ends_with('Z'));
    }
}
