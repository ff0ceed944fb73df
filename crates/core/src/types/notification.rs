//! Customer notification records.
//!
//! Notifications are persisted as a JSON array in a customer metafield. The
//! stored payload is untrusted: anything can write to it, and older releases
//! wrote looser shapes. Parsing therefore validates each element on its own
//! and drops the ones that do not fit, instead of failing the whole list.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    /// Ask the customer to review a delivered order.
    LeaveReview,
    /// One of the customer's reviews was featured.
    ReviewFeatured,
    /// Product recommendations.
    Recommendations,
    /// An order changed fulfillment status.
    OrderStatus,
    /// A discount is available to the customer.
    Discount,
}

impl NotificationType {
    /// The wire name of this notification type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LeaveReview => "leave_review",
            Self::ReviewFeatured => "review_featured",
            Self::Recommendations => "recommendations",
            Self::OrderStatus => "order_status",
            Self::Discount => "discount",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a notification type string is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leave_review" => Ok(Self::LeaveReview),
            "review_featured" => Ok(Self::ReviewFeatured),
            "recommendations" => Ok(Self::Recommendations),
            "order_status" => Ok(Self::OrderStatus),
            "discount" => Ok(Self::Discount),
            other => Err(UnknownNotificationType(other.to_owned())),
        }
    }
}

/// A single customer notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique identifier, stable across syncs.
    pub id: String,
    /// Notification kind.
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Short headline.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// When the customer read it, `None` while unread.
    pub read_at: Option<String>,
    /// Link target, if any.
    pub href: Option<String>,
    /// Free-form data for the client.
    pub payload: Option<Map<String, Value>>,
}

impl Notification {
    /// Whether the notification has not been read yet.
    #[must_use]
    pub const fn is_unread(&self) -> bool {
        self.read_at.is_none()
    }

    /// Mark as read at `at`. Returns `false` if it was already read.
    pub fn mark_read(&mut self, at: impl Into<String>) -> bool {
        if self.read_at.is_some() {
            return false;
        }
        self.read_at = Some(at.into());
        true
    }

    /// Validate one element of a stored notification array.
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        Some(Self {
            id: non_empty_string(obj, "id")?,
            kind: non_empty_string(obj, "type")?.parse().ok()?,
            title: non_empty_string(obj, "title")?,
            message: non_empty_string(obj, "message")?,
            created_at: non_empty_string(obj, "createdAt")?,
            read_at: non_empty_string(obj, "readAt"),
            href: non_empty_string(obj, "href"),
            payload: obj.get("payload").and_then(Value::as_object).cloned(),
        })
    }
}

/// A field that is present, a string, and not empty.
fn non_empty_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Outcome of parsing a stored notification payload.
///
/// Keeps "nothing stored" apart from "stored payload is corrupt" so callers
/// can log or repair the latter before collapsing both to a list.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationParse {
    /// The payload was absent or a JSON array; invalid elements were dropped.
    Parsed(Vec<Notification>),
    /// The payload was not valid JSON, or not an array.
    Malformed,
}

impl NotificationParse {
    /// Returns `true` for [`NotificationParse::Malformed`].
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed)
    }

    /// Collapse to a list, treating a malformed payload as empty.
    #[must_use]
    pub fn into_notifications(self) -> Vec<Notification> {
        match self {
            Self::Parsed(list) => list,
            Self::Malformed => Vec::new(),
        }
    }
}

/// Parse a stored notification payload, reporting corrupt payloads.
#[must_use]
pub fn try_parse_notifications(raw: Option<&str>) -> NotificationParse {
    let Some(raw) = raw else {
        return NotificationParse::Parsed(Vec::new());
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => NotificationParse::Parsed(
            items.iter().filter_map(Notification::from_value).collect(),
        ),
        Ok(_) | Err(_) => NotificationParse::Malformed,
    }
}

/// Parse a stored notification payload, failing closed to an empty list.
///
/// ```
/// use bramble_core::parse_notifications;
///
/// assert!(parse_notifications(Some("not json")).is_empty());
///
/// let raw = r#"[{"id":"1","type":"discount","title":"t","message":"m","createdAt":"2024-01-01"}]"#;
/// let list = parse_notifications(Some(raw));
/// assert_eq!(list.len(), 1);
/// assert!(list[0].read_at.is_none());
/// ```
#[must_use]
pub fn parse_notifications(raw: Option<&str>) -> Vec<Notification> {
    try_parse_notifications(raw).into_notifications()
}

/// Count notifications that have not been read.
#[must_use]
pub fn get_unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.is_unread()).count()
}

/// Merge freshly derived notifications into a stored list.
///
/// Records are deduplicated by id with the first occurrence winning, so a
/// stored record (and its `read_at`) always beats a derived one with the same
/// id. The result is ordered newest first and holds at most `max` records.
///
/// Records whose id appears in `incoming` survive truncation: dropping one
/// would make the next merge add it back as unread. Only records that are no
/// longer derived compete for the remaining room, oldest dropped first.
#[must_use]
pub fn merge_notifications(
    existing: Vec<Notification>,
    incoming: Vec<Notification>,
    max: usize,
) -> Vec<Notification> {
    let pinned: HashSet<String> = incoming.iter().map(|n| n.id.clone()).collect();

    let mut seen = HashSet::new();
    let mut merged: Vec<Notification> = existing
        .into_iter()
        .chain(incoming)
        .filter(|n| seen.insert(n.id.clone()))
        .collect();

    // Stable sort: equal timestamps keep stored order.
    merged.sort_by_cached_key(|n| Reverse(created_at_key(&n.created_at)));

    let pinned_count = merged.iter().filter(|n| pinned.contains(&n.id)).count();
    let mut room = max.saturating_sub(pinned_count);
    merged.retain(|n| {
        if pinned.contains(&n.id) {
            return true;
        }
        let keep = room > 0;
        room = room.saturating_sub(1);
        keep
    });

    merged.truncate(max);
    merged
}

/// Sort key for `createdAt`: the parsed instant, then the raw text.
///
/// Unparseable timestamps order before every valid one, so they end up last
/// in a newest-first list.
fn created_at_key(created_at: &str) -> (Option<DateTime<Utc>>, String) {
    let instant = DateTime::parse_from_rfc3339(created_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc));
    (instant, created_at.to_owned())
}
