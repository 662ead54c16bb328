//! Session middleware configuration and cart persistence.
//!
//! Sessions are stored in `SQLite` using tower-sessions. The shopper's cart
//! lives in the session, so every tab sharing the cookie sees the same cart.

use sqlx::SqlitePool;
use tower_sessions::{Expiry, Session, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use ma_furniture_core::{Cart, CartNotice};

use crate::config::ServerConfig;
use crate::error::AppError;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ma_session";

/// Session key holding the serialized cart.
pub const CART_KEY: &str = "ma_furniture_cart";

/// Session expiry time (30 days of inactivity).
const SESSION_EXPIRY_DAYS: i64 = 30;

/// Create the `SQLite` session store and its table.
///
/// # Errors
///
/// Returns `sqlx::Error` if the session table cannot be created.
pub async fn create_session_store(pool: &SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &ServerConfig,
) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(SESSION_EXPIRY_DAYS)))
        .with_secure(config.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Load the shopper's cart. A missing or corrupted cart is empty.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn load_cart(session: &Session) -> Result<Cart, AppError> {
    match session.get::<String>(CART_KEY).await {
        Ok(Some(raw)) => Ok(Cart::from_json(&raw)),
        Ok(None) => Ok(Cart::new()),
        Err(tower_sessions::session::Error::SerdeJson(e)) => {
            tracing::warn!(error = %e, "Discarding unreadable cart in session");
            Ok(Cart::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Store the cart in its compact form.
///
/// Returns a notice if lines had to be dropped.
///
/// # Errors
///
/// Returns an error if the cart cannot be serialized or the session store fails.
pub async fn save_cart(session: &Session, cart: &mut Cart) -> Result<Option<CartNotice>, AppError> {
    let notice = cart.compact();
    let raw = cart
        .to_json()
        .map_err(|e| AppError::Internal(format!("failed to serialize cart: {e}")))?;
    session.insert(CART_KEY, raw).await?;
    Ok(notice)
}
