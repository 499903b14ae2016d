//! Extractors whose rejections use the API error body.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use uuid::Uuid;

use super::error::ApiError;
use crate::errors::CoreError;
use crate::services::ValidationService;

pub const PROJECT_ID_HEADER: &str = "Project-ID";

/// Tenant identifier supplied by the upstream proxy.
#[derive(Clone, Copy, Debug)]
pub struct ProjectId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ProjectId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(PROJECT_ID_HEADER).ok_or_else(|| {
            CoreError::invalid_field(PROJECT_ID_HEADER, "Project-ID header is required")
        })?;
        let raw = value.to_str().map_err(|_| {
            CoreError::invalid_field(PROJECT_ID_HEADER, "Project-ID must be a UUID")
        })?;
        let id = ValidationService::parse_uuid(PROJECT_ID_HEADER, raw)?;
        Ok(ProjectId(id))
    }
}

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParams<T>(pub T);
