//! Request extractors

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON request body. Rejections render through [`ApiError`] so a malformed
/// body gets the same error envelope as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
