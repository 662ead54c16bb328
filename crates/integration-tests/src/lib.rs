//! Black-box tests against a running MA Furniture server.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the server
//! cargo run -p ma-furniture-server
//!
//! # Run the ignored tests against it
//! cargo test -p ma-furniture-integration-tests -- --ignored
//! ```
//!
//! Set `MA_BASE_URL` to target a server other than `http://localhost:3001`.
//! Tests create products with unique SKUs and delete them afterwards, so
//! they can run against a database that already holds a catalog.

use reqwest::Client;
use serde_json::{Value, json};

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("MA_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Client that keeps the session cookie between requests, like a browser.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A SKU no other test run will use.
#[must_use]
pub fn unique_sku(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Create a product through the API and return its JSON.
///
/// # Panics
///
/// Panics if the request fails or the server does not answer 201.
pub async fn create_product(client: &Client, body: &Value) -> Value {
    let resp = client
        .post(format!("{}/api/products", base_url()))
        .json(body)
        .send()
        .await
        .expect("Failed to create product");
    assert_eq!(resp.status().as_u16(), 201, "create product failed");
    resp.json().await.expect("Failed to parse product")
}

/// Delete a product, ignoring failures.
pub async fn delete_product(client: &Client, id: &Value) {
    let _ = client
        .delete(format!("{}/api/products/{id}", base_url()))
        .send()
        .await;
}

/// A valid product body with a fresh SKU.
#[must_use]
pub fn sample_product(name: &str, price: u32) -> Value {
    json!({
        "sku": unique_sku("IT"),
        "name": name,
        "price": price,
        "category": "kitchen",
        "section": "modern",
        "stock": 10
    })
}
