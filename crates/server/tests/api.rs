//! End-to-end tests of the HTTP API against an in-memory database.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use ma_furniture_server::config::ServerConfig;
use ma_furniture_server::middleware::session::create_session_store;
use ma_furniture_server::state::AppState;
use ma_furniture_server::{app, db};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-pixels";

struct TestApp {
    router: Router,
    uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let uploads = TempDir::new().unwrap();
        let pool = db::create_memory_pool().await.unwrap();
        let store = create_session_store(&pool).await.unwrap();
        let state = AppState::new(ServerConfig::new("sqlite::memory:", uploads.path()), pool);
        state.images().ensure_dirs().await.unwrap();

        Self {
            router: app(state, store),
            uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, headers, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let (status, _, body) = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        (status, body)
    }

    async fn json(&self, method: &str, uri: &str, body: &Value) -> (StatusCode, Value) {
        let (status, _, body) = self.send(json_request(method, uri, body, None)).await;
        (status, body)
    }

    async fn create_product(&self, body: &Value) -> Value {
        let (status, product) = self.json("POST", "/api/products", body).await;
        assert_eq!(status, StatusCode::CREATED, "{product}");
        product
    }
}

fn json_request(method: &str, uri: &str, body: &Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// The `name=value` part of the session cookie, if the response set one.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("ma_session="))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

fn multipart_body(boundary: &str, fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn multipart_request(
    method: &str,
    uri: &str,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let boundary = "ma-furniture-boundary";
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(multipart_body(boundary, fields, files)))
        .unwrap()
}

fn wardrobe() -> Value {
    json!({
        "sku": "MF-WR-001",
        "name": "Гардеробная система Лайт",
        "price": 45000,
        "category": "wardrobe",
        "section": "classic",
        "stock": 12,
        "features": ["Алюминиевый профиль", "Доводчики"],
        "featured": true
    })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "SQLite");

    let (status, _) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let app = TestApp::new().await;

    let (_, headers, _) = app
        .send(
            Request::get("/api/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(headers["x-request-id"], "req-42");
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_crud() {
    let app = TestApp::new().await;

    let created = app.create_product(&wardrobe()).await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["sku"], "MF-WR-001");
    assert_eq!(created["price"], json!(45000));
    assert!(created["price"].is_i64());
    assert_eq!(created["active"], true);

    let (status, fetched) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Гардеробная система Лайт");
    assert_eq!(fetched["features"], json!(["Алюминиевый профиль", "Доводчики"]));

    let (status, by_sku) = app.get("/api/products/sku/MF-WR-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_sku["id"], id);

    let (status, updated) = app
        .json("PUT", &format!("/api/products/{id}"), &json!({ "price": "47 500", "stock": 0 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 47500.0);
    assert_eq!(updated["stock"], 0);
    assert_eq!(updated["name"], "Гардеробная система Лайт");

    // The SKU lookup must not serve the cached pre-update product
    let (_, by_sku) = app.get("/api/products/sku/MF-WR-001").await;
    assert_eq!(by_sku["price"], 47500.0);

    let (status, _, body) = app
        .send(
            Request::delete(format!("/api/products/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");

    let (status, body) = app.get(&format!("/api/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn test_product_errors() {
    let app = TestApp::new().await;
    app.create_product(&wardrobe()).await;

    let (status, body) = app.json("POST", "/api/products", &wardrobe()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Product with this SKU already exists");

    let (status, body) = app
        .json("POST", "/api/products", &json!({ "name": "Без цены", "category": "kitchen" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Valid price is required"));

    let (status, body) = app.get("/api/products/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid product ID");

    let (status, _) = app
        .json("PUT", "/api/products/999", &json!({ "name": "Нет такого" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = TestApp::new().await;

    let (status, _, body) = app
        .send(
            Request::post("/api/products/update-section")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"oldSection\": "))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = app.get("/api/products?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");

    // Well-formed JSON of the wrong shape is a 400 too, not a 422
    let (status, body) = app.json("POST", "/api/cart/add", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("productId"), "{body}");
}

#[tokio::test]
async fn test_product_list_filters_and_pages() {
    let app = TestApp::new().await;
    app.create_product(&wardrobe()).await;
    app.create_product(&json!({
        "name": "Кухонный лифт",
        "price": 30000,
        "category": "kitchen",
        "section": "modern"
    }))
    .await;
    app.create_product(&json!({
        "name": "Пантограф",
        "price": 15000,
        "category": "pantograph",
        "section": "classic",
        "active": false
    }))
    .await;

    let (_, all) = app.get("/api/products").await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, kitchen) = app.get("/api/products?category=kitchen").await;
    assert_eq!(kitchen.as_array().unwrap().len(), 1);
    assert_eq!(kitchen[0]["name"], "Кухонный лифт");

    let (_, cheapest) = app.get("/api/products?sort=price_asc&limit=1").await;
    assert_eq!(cheapest.as_array().unwrap().len(), 1);
    assert_eq!(cheapest[0]["name"], "Пантограф");

    let (_, section) = app.get("/api/products/section/classic").await;
    assert_eq!(section.as_array().unwrap().len(), 1);

    let (_, page) = app.get("/api/products?page=2&per_page=2").await;
    assert_eq!(page["page"], 2);
    assert_eq!(page["total_items"], 3);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
    assert!(page["links"].is_array());
}

#[tokio::test]
async fn test_multipart_create_saves_images() {
    let app = TestApp::new().await;

    let (status, _, product) = app
        .send(multipart_request(
            "POST",
            "/api/products",
            &[
                ("name", "Пантограф с фото"),
                ("price", "15000"),
                ("category", "pantograph"),
                ("section", "premium"),
                ("features", "Газлифт"),
                ("features", "Нагрузка 15 кг"),
            ],
            &[("photo.png", "image/png", PNG_BYTES)],
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{product}");
    assert_eq!(product["features"], json!(["Газлифт", "Нагрузка 15 кг"]));

    let image = product["images"][0].as_str().unwrap().to_string();
    assert!(image.starts_with("/uploads/products/"));
    assert!(image.ends_with(".png"));

    let (status, headers, _) = app
        .send(Request::get(&image).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");

    let file_name = image.rsplit('/').next().unwrap();
    let on_disk = app.uploads.path().join("products").join(file_name);
    assert!(on_disk.exists());

    let id = product["id"].as_i64().unwrap();
    let (status, _, _) = app
        .send(
            Request::delete(format!("/api/products/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!on_disk.exists());
}

#[tokio::test]
async fn test_multipart_rejects_non_images() {
    let app = TestApp::new().await;

    let (status, _, body) = app
        .send(multipart_request(
            "POST",
            "/api/products",
            &[("name", "Шкаф"), ("price", "1000"), ("category", "wardrobe")],
            &[("notes.txt", "text/plain", b"hello")],
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only image files are allowed!");

    let (_, all) = app.get("/api/products").await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn test_update_section_moves_products() {
    let app = TestApp::new().await;
    app.create_product(&wardrobe()).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/products/update-section",
            &json!({ "oldSection": "classic", "newSection": "modern" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updatedCount"], 1);

    let (_, moved) = app.get("/api/products/section/modern").await;
    assert_eq!(moved.as_array().unwrap().len(), 1);

    let (status, body) = app
        .json("POST", "/api/products/update-section", &json!({ "newSection": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Old section code is required");
}

// =============================================================================
// Sections
// =============================================================================

#[tokio::test]
async fn test_section_lifecycle() {
    let app = TestApp::new().await;

    let (_, seeded) = app.get("/api/sections").await;
    assert_eq!(seeded.as_array().unwrap().len(), 4);

    let (status, loft) = app
        .json("POST", "/api/sections", &json!({ "name": "Лофт", "code": "loft" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let section_id = loft["id"].as_i64().unwrap();

    let (status, _) = app
        .json("POST", "/api/sections", &json!({ "name": "Лофт 2", "code": "loft" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let product = app
        .create_product(&json!({
            "name": "Лифт для лофта",
            "price": 20000,
            "category": "kitchen",
            "section": "loft"
        }))
        .await;

    let (status, _, body) = app
        .send(
            Request::delete(format!("/api/sections/{section_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affectedProducts"], 1);
    assert_eq!(body["deletedSection"]["code"], "loft");

    let (_, orphan) = app.get(&format!("/api/products/{}", product["id"])).await;
    assert_eq!(orphan["section"], "");
    assert_eq!(orphan["active"], false);

    let (status, body) = app
        .json("PUT", "/api/sections/999", &json!({ "name": "Нет", "code": "none" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Section not found");
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_search_stats_and_categories() {
    let app = TestApp::new().await;
    app.create_product(&wardrobe()).await;
    app.create_product(&json!({
        "name": "Кухонный лифт",
        "price": 30000,
        "category": "kitchen",
        "section": "modern",
        "description": "Подходит для гардеробной"
    }))
    .await;

    let (status, body) = app.get("/api/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Search query is required");

    let (status, found) = app.get("/api/search?q=%D0%B3%D0%B0%D1%80%D0%B4%D0%B5%D1%80%D0%BE%D0%B1").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Гардеробная система Лайт", "Кухонный лифт"]);

    let (_, stats) = app.get("/api/stats").await;
    assert_eq!(stats["total_products"], 2);
    assert_eq!(stats["featured_products"], 1);
    assert_eq!(stats["categories_count"], 2);
    assert_eq!(stats["total_sections"], 4);

    let (_, categories) = app.get("/api/categories").await;
    assert_eq!(categories["kitchen"], "Кухонные лифты");
}

#[tokio::test]
async fn test_migrate_from_local_storage() {
    let app = TestApp::new().await;
    app.create_product(&wardrobe()).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/migrate-from-localstorage",
            &json!({
                "sections": [
                    { "name": "Лофт", "code": "loft" },
                    { "name": "Классика", "code": "classic" }
                ],
                "products": [
                    wardrobe(),
                    { "name": "Новый лифт", "price": 25000, "category": "kitchen", "section": "loft" },
                    { "name": "Без цены", "category": "kitchen" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Migration completed");
    assert_eq!(body["migratedSections"], 1);
    assert_eq!(body["migratedProducts"], 1);
    assert_eq!(
        body["skipped"],
        json!([
            "Section Классика (classic): Section with this code already exists",
            "Product Гардеробная система Лайт (MF-WR-001): Product with this SKU already exists"
        ])
    );
    assert_eq!(body["errors"], json!(["Product Без цены: Valid price is required"]));
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_follows_session_cookie() {
    let app = TestApp::new().await;
    let product = app.create_product(&wardrobe()).await;
    let product_id = product["id"].clone();

    let (status, headers, cart) = app
        .send(json_request(
            "POST",
            "/api/cart/add",
            &json!({ "productId": product_id }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["totalItems"], 1);
    assert_eq!(cart["message"], "\"Гардеробная система Лайт\" добавлен в корзину");
    let cookie = session_cookie(&headers).unwrap();

    let (_, _, cart) = app
        .send(json_request(
            "POST",
            "/api/cart/add",
            &json!({ "productId": product_id.to_string() }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(cart["totalItems"], 2);
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["total"], json!(90000));

    let (_, _, count) = app
        .send(
            Request::get("/api/cart/count")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(count["count"], 2);

    // Without the cookie the shopper gets a fresh cart
    let (_, fresh) = app.get("/api/cart").await;
    assert_eq!(fresh["totalItems"], 0);

    let (_, _, cart) = app
        .send(json_request(
            "POST",
            "/api/cart/update",
            &json!({ "productId": product_id, "change": -2 }),
            Some(&cookie),
        ))
        .await;
    assert_eq!(cart["items"], json!([]));

    let (_, _, cart) = app
        .send(json_request("POST", "/api/cart/clear", &json!({}), Some(&cookie)))
        .await;
    assert_eq!(cart["message"], "Корзина очищена");
}

#[tokio::test]
async fn test_cart_rejects_unavailable_products() {
    let app = TestApp::new().await;
    let sold_out = app
        .create_product(&json!({
            "name": "Распродано",
            "price": 1000,
            "category": "kitchen",
            "section": "modern",
            "stock": 0
        }))
        .await;
    let hidden = app
        .create_product(&json!({
            "name": "Скрыто",
            "price": 1000,
            "category": "kitchen",
            "section": "modern",
            "active": false
        }))
        .await;

    let (status, body) = app
        .json("POST", "/api/cart/add", &json!({ "productId": sold_out["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product is out of stock");

    let untracked = app
        .create_product(&json!({
            "name": "Без остатка",
            "price": 1000,
            "category": "kitchen",
            "section": "modern"
        }))
        .await;
    assert_eq!(untracked["stock"], 0);
    let (status, body) = app
        .json("POST", "/api/cart/add", &json!({ "productId": untracked["id"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product is out of stock");

    let (status, body) = app
        .json("POST", "/api/cart/add", &json!({ "productId": hidden["id"] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");

    let (status, body) = app
        .json("POST", "/api/cart/add", &json!({ "productId": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid product ID");
}
