//! Shopify global ID helpers.
//!
//! Shopify identifies objects with opaque global IDs such as
//! `gid://shopify/ProductVariant/42`. Storefront links often carry only the
//! numeric tail, so variant IDs arriving from query strings are normalized
//! before they reach the Storefront API.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Canonical prefix of a product variant global ID.
pub const VARIANT_GID_PREFIX: &str = "gid://shopify/ProductVariant/";

/// Canonical prefix of a cart global ID.
pub const CART_GID_PREFIX: &str = "gid://shopify/Cart/";

/// A normalized product variant global ID.
///
/// Only produced by [`normalize_variant_id`] (or deserialization of an
/// already-stored value), so holders can pass it straight to the
/// Storefront API as a `merchandiseId`.
///
/// ```
/// use bramble_core::{VARIANT_GID_PREFIX, normalize_variant_id};
///
/// let id = normalize_variant_id(" 123 ").unwrap();
/// assert_eq!(id.as_str(), format!("{VARIANT_GID_PREFIX}123"));
///
/// assert!(normalize_variant_id("abc").is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct VariantGid(String);

impl VariantGid {
    /// Returns the global ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for VariantGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VariantGid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<VariantGid> for String {
    fn from(id: VariantGid) -> Self {
        id.0
    }
}

/// Normalize a raw variant identifier.
///
/// - Surrounding whitespace is ignored.
/// - An already-prefixed global ID is returned unchanged.
/// - A purely numeric ID gets the variant prefix.
/// - Anything else (including empty input) is rejected with `None`.
#[must_use]
pub fn normalize_variant_id(raw: &str) -> Option<VariantGid> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.starts_with(VARIANT_GID_PREFIX) {
        return Some(VariantGid(trimmed.to_owned()));
    }

    if trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Some(VariantGid(format!("{VARIANT_GID_PREFIX}{trimmed}")));
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id_is_prefixed() {
        let id = normalize_variant_id("123").unwrap();
        assert_eq!(id.as_str(), "gid://shopify/ProductVariant/123");
    }

    #[test]
    fn test_prefixed_id_is_unchanged() {
        let raw = "gid://shopify/ProductVariant/987654321";
        assert_eq!(normalize_variant_id(raw).unwrap().as_str(), raw);
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let id = normalize_variant_id("  42\n").unwrap();
        assert_eq!(id.as_str(), "gid://shopify/ProductVariant/42");
    }

    #[test]
    fn test_empty_and_blank_rejected() {
        assert!(normalize_variant_id("").is_none());
        assert!(normalize_variant_id("   ").is_none());
    }

    #[test]
    fn test_malformed_ids_rejected() {
        for raw in [
            "abc",
            "12a",
            "-12",
            "1.5",
            "gid://shopify/Product/1",
            "ProductVariant/1",
            "１２３", // full-width digits are not ASCII
        ] {
            assert!(normalize_variant_id(raw).is_none(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_display_and_into_string() {
        let id = normalize_variant_id("7").unwrap();
        assert_eq!(id.to_string(), "gid://shopify/ProductVariant/7");
        let s: String = id.into();
        assert_eq!(s, "gid://shopify/ProductVariant/7");
    }
}
