//! Core types for Bramble.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod gid;
pub mod notification;
pub mod status;

pub use gid::{CART_GID_PREFIX, VARIANT_GID_PREFIX, VariantGid, normalize_variant_id};
pub use notification::{
    Notification, NotificationParse, NotificationType, UnknownNotificationType, get_unread_count,
    merge_notifications, parse_notifications, try_parse_notifications,
};
pub use status::FulfillmentStatus;
