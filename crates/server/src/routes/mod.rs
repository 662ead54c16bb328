//! HTTP route handlers for the catalog server.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health/ready                  - Readiness (database reachable)
//!
//! # Service
//! GET    /api/health                    - Service status
//!
//! # Products
//! GET    /api/products                  - List (filters, sort, limit/offset or page)
//! POST   /api/products                  - Create (multipart or JSON)
//! POST   /api/products/update-section   - Move products between sections
//! GET    /api/products/sku/{sku}        - Get by SKU
//! GET    /api/products/section/{code}   - Active products of a section
//! GET    /api/products/{id}             - Get by ID
//! PUT    /api/products/{id}             - Update (multipart or JSON)
//! DELETE /api/products/{id}             - Delete with uploaded images
//!
//! # Sections
//! GET    /api/sections                  - List
//! POST   /api/sections                  - Create
//! PUT    /api/sections/{id}             - Update
//! DELETE /api/sections/{id}             - Delete, un-sectioning its products
//!
//! # Catalog
//! GET    /api/stats                     - Catalog statistics
//! GET    /api/search                    - Ranked search over active products
//! GET    /api/categories                - Category labels
//! POST   /api/migrate-from-localstorage - Import browser-stored catalog data
//!
//! # Cart (session)
//! GET    /api/cart                      - Current cart
//! POST   /api/cart/add                  - Add one unit
//! POST   /api/cart/update               - Change quantity
//! POST   /api/cart/remove               - Remove a line
//! POST   /api/cart/clear                - Empty the cart
//! GET    /api/cart/count                - Item count
//! ```

pub mod cart;
pub mod catalog;
pub mod health;
pub mod migrate;
pub mod products;
pub mod sections;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/update-section", post(products::update_section))
        .route("/sku/{sku}", get(products::show_by_sku))
        .route("/section/{code}", get(products::by_section))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the section routes router.
pub fn section_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(sections::index).post(sections::create))
        .route("/{id}", put(sections::update).delete(sections::delete))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the `/api` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .nest("/products", product_routes())
        .nest("/sections", section_routes())
        .nest("/cart", cart_routes())
        .route("/stats", get(catalog::stats))
        .route("/search", get(catalog::search))
        .route("/categories", get(catalog::categories))
        .route("/migrate-from-localstorage", post(migrate::migrate))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}
