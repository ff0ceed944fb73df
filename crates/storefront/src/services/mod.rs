//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - "Buy again" cart line reconciliation
//! - `notifications` - Customer notification sync and mark-as-read
//!
//! Both are written against small traits (`CartHandler`,
//! `NotificationStore`) so the logic runs without Shopify in tests.

pub mod cart;
pub mod notifications;
