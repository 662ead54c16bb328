//! Catalog API tests against a running server.
//!
//! Run with: cargo test -p ma-furniture-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use ma_furniture_integration_tests::{
    base_url, client, create_product, delete_product, sample_product,
};

// ============================================================================
// Service
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/api/health", base_url()))
        .send()
        .await
        .expect("Failed to get health");

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Failed to parse health");
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "SQLite");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_categories() {
    let body: Value = client()
        .get(format!("{}/api/categories", base_url()))
        .send()
        .await
        .expect("Failed to get categories")
        .json()
        .await
        .expect("Failed to parse categories");

    assert_eq!(body["pantograph"], "Пантографы");
    assert_eq!(body["kitchen"], "Кухонные лифты");
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_product_lifecycle() {
    let client = client();
    let base_url = base_url();
    let body = sample_product("Интеграционный лифт", 21000);
    let sku = body["sku"].as_str().expect("sku").to_string();

    let product = create_product(&client, &body).await;
    let id = product["id"].clone();

    let resp = client
        .post(format!("{base_url}/api/products"))
        .json(&body)
        .send()
        .await
        .expect("Failed to post duplicate");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let fetched: Value = client
        .get(format!("{base_url}/api/products/sku/{sku}"))
        .send()
        .await
        .expect("Failed to get by SKU")
        .json()
        .await
        .expect("Failed to parse product");
    assert_eq!(fetched["id"], id);

    let resp = client
        .put(format!("{base_url}/api/products/{id}"))
        .json(&json!({ "badge": "Хит", "price": 19990 }))
        .send()
        .await
        .expect("Failed to update product");
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.expect("Failed to parse product");
    assert_eq!(updated["badge"], "Хит");
    assert_eq!(updated["price"], 19990.0);

    delete_product(&client, &id).await;
    let resp = client
        .get(format!("{base_url}/api/products/{id}"))
        .send()
        .await
        .expect("Failed to get deleted product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_multipart_upload() {
    let client = client();
    let base_url = base_url();

    let image = reqwest::multipart::Part::bytes(b"\x89PNG\r\n\x1a\nintegration".to_vec())
        .file_name("photo.png")
        .mime_str("image/png")
        .expect("Failed to build image part");
    let form = reqwest::multipart::Form::new()
        .text("name", "Пантограф с фото")
        .text("price", "45000")
        .text("category", "pantograph")
        .text("section", "classic")
        .text("sku", ma_furniture_integration_tests::unique_sku("IT-IMG"))
        .part("images", image);

    let resp = client
        .post(format!("{base_url}/api/products"))
        .multipart(form)
        .send()
        .await
        .expect("Failed to upload product");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let product: Value = resp.json().await.expect("Failed to parse product");

    let image_url = product["images"][0].as_str().expect("image url").to_string();
    let resp = client
        .get(format!("{base_url}{image_url}"))
        .send()
        .await
        .expect("Failed to fetch image");
    assert_eq!(resp.status(), StatusCode::OK);

    delete_product(&client, &product["id"]).await;
    let resp = client
        .get(format!("{base_url}{image_url}"))
        .send()
        .await
        .expect("Failed to fetch deleted image");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_search_requires_query() {
    let resp = client()
        .get(format!("{}/api/search?q=", base_url()))
        .send()
        .await
        .expect("Failed to search");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse error");
    assert_eq!(body["error"], "Search query is required");
}

#[tokio::test]
#[ignore = "Requires running server"]
async fn test_stats_shape() {
    let body: Value = client()
        .get(format!("{}/api/stats", base_url()))
        .send()
        .await
        .expect("Failed to get stats")
        .json()
        .await
        .expect("Failed to parse stats");

    for key in [
        "total_products",
        "active_products",
        "featured_products",
        "categories_count",
        "sections_count",
        "total_sections",
    ] {
        assert!(body[key].is_i64(), "missing {key}");
    }
}
