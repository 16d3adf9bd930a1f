use std::marker::PhantomData;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use tenancy_core::{
    App, BeforeHook, ErrorKind, HookContext, Params, Record, ServiceError, TenantScope,
};

/// Rejects payloads (or patches) whose `field` names a record outside the
/// owning tenant.
///
/// A tenant caller looks up under its own scope. A platform caller looks up
/// under the tenant that owns (or will own) the written record, so a
/// platform write cannot link two tenants either.
pub struct MustReference<R, T> {
    app: App,
    service: &'static str,
    field: &'static str,
    pick: fn(&R) -> Option<&str>,
    _target: PhantomData<fn() -> T>,
}

impl<R, T> MustReference<R, T> {
    pub fn new(
        app: App,
        service: &'static str,
        field: &'static str,
        pick: fn(&R) -> Option<&str>,
    ) -> Self {
        Self {
            app,
            service,
            field,
            pick,
            _target: PhantomData,
        }
    }

    /// Scope the referenced record must be visible in.
    async fn owner_scope(&self, ctx: &HookContext<R>) -> Result<TenantScope>
    where
        R: Record,
    {
        if ctx.scope.tenant_id().is_some() {
            return Ok(ctx.scope.clone());
        }
        let owner = match ctx.id.as_deref() {
            // update/patch keep the stored owner
            Some(id) => self
                .app
                .service::<R>(&ctx.service)?
                .get(&ctx.scope, id, Params::internal())
                .await?
                .tenant_id(),
            None => ctx.data.as_ref().and_then(|data| data.tenant_id()),
        };
        Ok(owner.map_or_else(|| ctx.scope.clone(), TenantScope::for_tenant))
    }

    fn rejected(&self, reason: &str) -> anyhow::Error {
        ServiceError::unprocessable(format!("Invalid reference in `{}`", self.field))
            .with_errors(json!({ self.field: [reason] }))
            .into_anyhow()
    }
}

#[async_trait]
impl<R, T> BeforeHook<R> for MustReference<R, T>
where
    R: Record,
    T: Send + Sync + 'static,
{
    async fn run(&self, ctx: &mut HookContext<R>) -> Result<()> {
        let target = match (ctx.data.as_ref(), ctx.patch.as_ref()) {
            (Some(data), _) => (self.pick)(data).map(str::to_string),
            (None, Some(patch)) => match patch.get(self.field) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => return Err(self.rejected("must be a string")),
            },
            (None, None) => None,
        };
        let Some(target) = target else {
            return Ok(());
        };
        let target = target.trim();
        if target.is_empty() {
            return Err(self.rejected("must not be empty"));
        }

        let scope = self.owner_scope(ctx).await?;
        let svc = self.app.service::<T>(self.service)?;
        match svc.get(&scope, target, Params::internal()).await {
            Ok(_) => Ok(()),
            Err(err) => match ServiceError::find(&err) {
                Some(e) if e.kind == ErrorKind::NotFound => Err(self.rejected("not found")),
                _ => Err(err),
            },
        }
    }
}
