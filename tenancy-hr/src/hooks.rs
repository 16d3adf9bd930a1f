use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tenancy_core::{App, AppHook, CallInfo, RequireAuthenticated, ServiceError, TenantResolver};
use tracing::debug;

pub struct TraceCalls;

#[async_trait]
impl AppHook for TraceCalls {
    async fn before(&self, call: CallInfo<'_>) -> Result<()> {
        debug!(
            service = call.service,
            method = call.method.as_str(),
            id = call.id,
            tenant_id = ?call.scope.tenant_id(),
            subject = call.params.claims.subject(),
            provider = call.params.provider.as_deref().unwrap_or("internal"),
            "call"
        );
        Ok(())
    }
}

/// An authenticated member account without a tenant sees nothing.
///
/// Such a token resolves to an empty scope, which the store would treat as
/// platform access; only admins may act without a tenant.
pub struct DenyTenantlessMembers {
    resolver: TenantResolver,
}

impl DenyTenantlessMembers {
    pub fn new(resolver: TenantResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl AppHook for DenyTenantlessMembers {
    async fn before(&self, call: CallInfo<'_>) -> Result<()> {
        let claims = &call.params.claims;
        if call.params.is_internal()
            || !claims.is_authenticated()
            || call.scope.tenant_id().is_some()
            || self.resolver.is_admin(claims)
        {
            return Ok(());
        }
        Err(ServiceError::forbidden("Account is not assigned to a tenant").into_anyhow())
    }
}

pub fn global_hooks(app: &App, resolver: TenantResolver) {
    app.hook(Arc::new(TraceCalls));
    app.hook(Arc::new(RequireAuthenticated));
    app.hook(Arc::new(DenyTenantlessMembers::new(resolver)));
}
