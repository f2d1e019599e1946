//! Request extractors whose rejections render as `AppError`.
//!
//! axum's own `Json`, `Query` and `Path` answer malformed input with a plain
//! text body (and 422 for well-formed JSON of the wrong shape). These wrappers
//! route every rejection through `AppError::Validation` so clients always get
//! the JSON error envelope with a 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
