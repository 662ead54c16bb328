//! Request extractors whose rejections render as JSON `{"error": ...}`.
//!
//! Axum's own `Json` and `Query` reject with plain-text bodies (and 422 for
//! well-formed JSON of the wrong shape). These wrappers route the rejection
//! through [`AppError`] so every client error has the same body and a 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
