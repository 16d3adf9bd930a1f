use axum::{extract::FromRequestParts, http::request::Parts};
use tenancy_core::{ServiceError, TenantScope, VerifiedClaims};

use crate::TenancyAxumError;

/// The request's [`TenantScope`], placed by the tenant middleware.
pub struct Scoped(pub TenantScope);

/// The request's [`VerifiedClaims`], placed by the tenant middleware.
pub struct Claims(pub VerifiedClaims);

fn middleware_missing() -> TenancyAxumError {
    ServiceError::general_error("tenant resolution middleware is not installed").into()
}

impl<S> FromRequestParts<S> for Scoped
where
    S: Send + Sync,
{
    type Rejection = TenancyAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantScope>()
            .cloned()
            .map(Scoped)
            .ok_or_else(middleware_missing)
    }
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = TenancyAxumError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedClaims>()
            .cloned()
            .map(Claims)
            .ok_or_else(middleware_missing)
    }
}
