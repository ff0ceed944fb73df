//! Bramble Core - Shared domain types.
//!
//! This crate provides the types used by the Bramble storefront and its tools:
//! - `storefront` - Public-facing e-commerce site
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Parsing of untrusted input (variant IDs, persisted
//! notification payloads) lives here so it can be tested without a server.
//!
//! # Modules
//!
//! - [`types`] - Shopify global IDs, notification records, order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
