use anyhow::Result;
use async_trait::async_trait;
use tenancy_core::{BeforeHook, HookContext, ServiceError, ServiceMethodKind, TenantResolver};

use crate::records::Tenant;

/// The tenant directory belongs to the platform.
///
/// Admins and internal calls have full access. A tenant member may only
/// `get` its own entry; listing or changing the directory is forbidden.
pub struct RequireAdmin {
    resolver: TenantResolver,
}

impl RequireAdmin {
    pub fn new(resolver: TenantResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl BeforeHook<Tenant> for RequireAdmin {
    async fn run(&self, ctx: &mut HookContext<Tenant>) -> Result<()> {
        if ctx.params.is_internal() || self.resolver.is_admin(&ctx.params.claims) {
            return Ok(());
        }

        let own_entry = ctx.method == ServiceMethodKind::Get
            && matches!(
                (ctx.scope.tenant_id(), ctx.id.as_deref()),
                (Some(tenant), Some(id)) if tenant.to_string() == id
            );
        if own_entry {
            return Ok(());
        }
        Err(ServiceError::forbidden("Only platform admins can manage tenants").into_anyhow())
    }
}
