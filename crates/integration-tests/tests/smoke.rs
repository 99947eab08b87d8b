//! Smoke tests against a deployed storefront.
//!
//! These tests require:
//! - A storefront running with a seeded catalog (`pasteleria-cli migrate`,
//!   `pasteleria-cli seed`, then `cargo run -p pasteleria-storefront`)
//!
//! Run with: `cargo test -p pasteleria-integration-tests --test smoke -- --ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Base URL for the storefront API (configurable via environment).
fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_ready() {
    let resp = client()
        .get(format!("{}/health/ready", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server with a seeded catalog"]
async fn test_seeded_catalog() {
    let base_url = storefront_base_url();
    let client = client();

    let products: Vec<Value> = client
        .get(format!("{base_url}/api/products"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .unwrap();
    assert!(!products.is_empty());

    let categories: Vec<Value> = client
        .get(format!("{base_url}/api/categories"))
        .send()
        .await
        .expect("Failed to list categories")
        .json()
        .await
        .unwrap();
    assert!(!categories.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server with a seeded catalog"]
async fn test_guest_cart() {
    let base_url = storefront_base_url();
    let client = client();

    let products: Vec<Value> = client
        .get(format!("{base_url}/api/products"))
        .send()
        .await
        .expect("Failed to list products")
        .json()
        .await
        .unwrap();
    let Some(product) = products.iter().find(|p| p["stock"].as_i64() > Some(0)) else {
        return;
    };

    let resp = client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({ "pastel_id": product["id"], "cantidad": 1 }))
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let count: Value = client
        .get(format!("{base_url}/api/cart/count"))
        .send()
        .await
        .expect("Failed to read cart count")
        .json()
        .await
        .unwrap();
    assert_eq!(count["count"], 1);

    let resp = client
        .delete(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Failed to clear cart");
    assert!(resp.status().is_success());
}
