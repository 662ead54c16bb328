//! HTTP middleware stack for the catalog server.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (recorded in the span and Sentry scope)
//! 4. CORS (shop pages on other origins, with credentials)
//! 5. Body limit
//! 6. Session layer (tower-sessions with `SQLite` store, holds the cart)

pub mod request_id;
pub mod session;

pub use request_id::request_id_middleware;
pub use session::{CART_KEY, create_session_layer, load_cart, save_cart};
