//! Per-request tenant context.
//!
//! A [`RequestTenantContext`] is created fresh for every request or unit of
//! work and written at most once. There is deliberately no reset: a context
//! can't be recycled, so stale tenant state can't leak into the next request.
//!
//! Data access never takes the context directly. It takes a [`TenantScope`],
//! a cheap handle to one context that is only handed out by the resolution
//! step or by the explicit administrative constructors below.

use std::sync::{Arc, OnceLock};

use tracing::error;

use crate::errors::IsolationError;
use crate::tenant::TenantId;

/// Holder of at most one tenant id, with set-once semantics.
#[derive(Debug, Default)]
pub struct RequestTenantContext {
    tenant: OnceLock<TenantId>,
}

impl RequestTenantContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the tenant for this request.
    ///
    /// Fails on any second call, even with the same value.
    pub fn set(&self, tenant_id: TenantId) -> Result<(), IsolationError> {
        self.tenant.set(tenant_id).map_err(|attempted| {
            // `set` only fails once a value exists.
            let existing = self.tenant.get().copied().unwrap_or(attempted);
            error!(
                existing = %existing,
                attempted = %attempted,
                "request tenant context set twice"
            );
            IsolationError::ContextAlreadySet {
                existing,
                attempted,
            }
        })
    }

    /// The active tenant, `None` meaning no tenant scoping applies.
    pub fn get(&self) -> Option<TenantId> {
        self.tenant.get().copied()
    }

    pub fn is_set(&self) -> bool {
        self.tenant.get().is_some()
    }
}

/// Handle to the tenant context of one request, required by every read and
/// write against the data access layer.
///
/// Cloning shares the same context; it never copies the tenant out. The
/// value is read at the moment each query runs.
#[derive(Debug, Clone)]
pub struct TenantScope {
    ctx: Arc<RequestTenantContext>,
}

impl TenantScope {
    /// Scope over a context owned by the hosting runtime (e.g. HTTP
    /// middleware that creates the context before resolution fills it).
    pub fn from_context(ctx: Arc<RequestTenantContext>) -> Self {
        Self { ctx }
    }

    /// Scope deliberately bound to one tenant, for background jobs and
    /// seeding that act on behalf of that tenant.
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        let ctx = RequestTenantContext::new();
        let _ = ctx.set(tenant_id);
        Self { ctx: Arc::new(ctx) }
    }

    /// Scope deliberately bound to no tenant.
    ///
    /// Reads are unfiltered and inserts of tenant-scoped records must carry
    /// their own tenant id. Reserved for trusted platform-level code.
    pub fn platform() -> Self {
        Self {
            ctx: Arc::new(RequestTenantContext::new()),
        }
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.ctx.get()
    }

    pub fn context(&self) -> &RequestTenantContext {
        &self.ctx
    }
}
