//! Request extractors whose rejections go through the application's error
//! responses instead of axum's plain-text defaults.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::{AppError, JsonError};

/// JSON body for `/api` handlers. A malformed body answers 400 with an
/// `{"error": ...}` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(JsonError))]
pub struct ApiJson<T>(pub T);

/// Path parameters for `/api` handlers.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(JsonError))]
pub struct ApiPath<T>(pub T);

/// URL-encoded form for page handlers.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct PageForm<T>(pub T);
