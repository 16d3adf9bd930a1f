//! Per-request tenant resolution.
//!
//! Order inside the middleware is fixed: verify credentials, create a fresh
//! [`RequestTenantContext`], resolve the tenant claim into it, then expose
//! the resulting [`TenantScope`] and [`VerifiedClaims`] as request
//! extensions for handlers.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tenancy_core::{
    RequestTenantContext, ServiceError, TenantResolver, TenantScope, VerifiedClaims,
};
use tracing::debug;

use crate::TenancyAxumError;

/// Identity verification for incoming requests.
pub trait ClaimsVerifier: Send + Sync + 'static {
    /// Claims of the caller. Requests without credentials yield
    /// [`VerifiedClaims::anonymous`]; bad credentials are an error.
    fn verify(&self, headers: &HeaderMap) -> Result<VerifiedClaims, ServiceError>;
}

#[cfg(feature = "auth")]
impl ClaimsVerifier for tenancy_auth::JwtVerifier {
    fn verify(&self, headers: &HeaderMap) -> Result<VerifiedClaims, ServiceError> {
        match tenancy_auth::extract_bearer_token(headers) {
            None => Ok(VerifiedClaims::anonymous()),
            Some(token) => token
                .and_then(|t| tenancy_auth::JwtVerifier::verify(self, t))
                .map_err(tenancy_auth::AuthError::into_service_error),
        }
    }
}

/// State for [`resolve_tenant`].
#[derive(Clone)]
pub struct TenantLayer {
    pub verifier: Arc<dyn ClaimsVerifier>,
    pub resolver: TenantResolver,
}

impl TenantLayer {
    pub fn new(verifier: Arc<dyn ClaimsVerifier>, resolver: TenantResolver) -> Self {
        Self { verifier, resolver }
    }
}

pub async fn resolve_tenant(
    State(layer): State<TenantLayer>,
    mut req: Request,
    next: Next,
) -> Result<Response, TenancyAxumError> {
    let claims = layer.verifier.verify(req.headers())?;

    let ctx = Arc::new(RequestTenantContext::new());
    let tenant = layer.resolver.resolve_into(&claims, &ctx)?;
    debug!(
        tenant_id = ?tenant,
        authenticated = claims.is_authenticated(),
        "request tenant context ready"
    );

    req.extensions_mut().insert(TenantScope::from_context(ctx));
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
