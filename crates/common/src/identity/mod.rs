//! Viewer identity extraction
//!
//! Authentication happens upstream: every
//! request arrives with an already-authenticated user id in the
//! `X-User-Id` header, or without one for anonymous reads. The core
//! never authenticates; it only carries the identity into each
//! operation as an explicit parameter.

use crate::errors::{AppError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

/// An authenticated viewer, required for write operations
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: Uuid,
}

/// An optional viewer, for read operations that allow anonymous access
#[derive(Debug, Clone, Copy, Default)]
pub struct MaybeViewer(pub Option<Uuid>);

impl MaybeViewer {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0
    }
}

fn parse_user_header(parts: &Parts) -> Result<Option<Uuid>> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    let raw = value.to_str().map_err(|_| AppError::Unauthorized {
        message: "Malformed X-User-Id header".to_string(),
    })?;

    let user_id = Uuid::parse_str(raw).map_err(|_| AppError::Unauthorized {
        message: "X-User-Id header is not a valid user id".to_string(),
    })?;

    Ok(Some(user_id))
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match parse_user_header(parts)? {
            Some(user_id) => Ok(Viewer { user_id }),
            None => Err(AppError::Unauthorized {
                message: "Missing X-User-Id header".to_string(),
            }),
        }
    }
}

impl<S> FromRequestParts<S> for MaybeViewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        Ok(MaybeViewer(parse_user_header(parts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(USER_ID_HEADER, v);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let parts = parts_with_header(None);
        assert!(parse_user_header(&parts).unwrap().is_none());
    }

    #[test]
    fn test_valid_header() {
        let id = Uuid::new_v4();
        let parts = parts_with_header(Some(&id.to_string()));
        assert_eq!(parse_user_header(&parts).unwrap(), Some(id));
    }

    #[test]
    fn test_invalid_header_rejected() {
        let parts = parts_with_header(Some("not-a-uuid"));
        let err = parse_user_header(&parts).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }
}
