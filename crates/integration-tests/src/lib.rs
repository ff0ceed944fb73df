//! Integration tests for Bramble.
//!
//! The tests in `tests/` talk to a running storefront over HTTP and are
//! `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and the server
//! cargo run -p bramble-cli -- migrate
//! cargo run -p bramble-storefront
//!
//! # Run integration tests
//! STOREFRONT_BASE_URL=http://localhost:3000 cargo test -p bramble-integration-tests -- --ignored
//! ```

use reqwest::{Client, redirect::Policy};

/// Base URL of the storefront under test (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Client that surfaces redirects instead of following them.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
}
