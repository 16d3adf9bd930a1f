use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::config::ConfigSnapshot;
use crate::context::TenantScope;
use crate::errors::ServiceError;
use crate::params::Params;
use crate::service::ServiceMethodKind;

/// Output of a service call as seen by after hooks.
#[derive(Debug, Clone)]
pub enum HookResult<R> {
    One(R),
    Many(Vec<R>),
}

/// State threaded through one service call.
pub struct HookContext<R> {
    pub scope: TenantScope,
    pub service: String,
    pub method: ServiceMethodKind,
    pub id: Option<String>,
    pub params: Params,
    /// Payload for create/update.
    pub data: Option<R>,
    /// Payload for patch.
    pub patch: Option<Value>,
    pub result: Option<HookResult<R>>,
    pub error: Option<anyhow::Error>,
    pub config: ConfigSnapshot,
}

impl<R> HookContext<R> {
    pub fn new(
        scope: TenantScope,
        service: impl Into<String>,
        method: ServiceMethodKind,
        params: Params,
        config: ConfigSnapshot,
    ) -> Self {
        Self {
            scope,
            service: service.into(),
            method,
            id: None,
            params,
            data: None,
            patch: None,
            result: None,
            error: None,
            config,
        }
    }

    /// View shared with app-level hooks.
    pub fn call(&self) -> CallInfo<'_> {
        CallInfo {
            scope: &self.scope,
            service: &self.service,
            method: self.method,
            id: self.id.as_deref(),
            params: &self.params,
        }
    }
}

#[async_trait]
pub trait BeforeHook<R>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R>) -> Result<()>;
}

#[async_trait]
pub trait AfterHook<R>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R>) -> Result<()>;
}

/// Runs when the call failed. Clearing `ctx.error` recovers the call.
#[async_trait]
pub trait ErrorHook<R>: Send + Sync {
    async fn run(&self, ctx: &mut HookContext<R>) -> Result<()>;
}

/// Record-independent view of a call.
#[derive(Debug, Clone, Copy)]
pub struct CallInfo<'a> {
    pub scope: &'a TenantScope,
    pub service: &'a str,
    pub method: ServiceMethodKind,
    pub id: Option<&'a str>,
    pub params: &'a Params,
}

/// Hook registered on the app; runs before every service's own hooks.
#[async_trait]
pub trait AppHook: Send + Sync {
    async fn before(&self, call: CallInfo<'_>) -> Result<()>;
}

/// Before/after/error hooks of one service.
pub struct ServiceHooks<R> {
    pub before_all: Vec<Arc<dyn BeforeHook<R>>>,
    pub before_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn BeforeHook<R>>>>,
    pub after_all: Vec<Arc<dyn AfterHook<R>>>,
    pub after_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn AfterHook<R>>>>,
    pub error_all: Vec<Arc<dyn ErrorHook<R>>>,
    pub error_by_method: HashMap<ServiceMethodKind, Vec<Arc<dyn ErrorHook<R>>>>,
}

impl<R> Default for ServiceHooks<R> {
    fn default() -> Self {
        Self {
            before_all: Vec::new(),
            before_by_method: HashMap::new(),
            after_all: Vec::new(),
            after_by_method: HashMap::new(),
            error_all: Vec::new(),
            error_by_method: HashMap::new(),
        }
    }
}

impl<R> ServiceHooks<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_all(&mut self, hook: Arc<dyn BeforeHook<R>>) -> &mut Self {
        self.before_all.push(hook);
        self
    }

    pub fn before(&mut self, method: ServiceMethodKind, hook: Arc<dyn BeforeHook<R>>) -> &mut Self {
        self.before_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn after_all(&mut self, hook: Arc<dyn AfterHook<R>>) -> &mut Self {
        self.after_all.push(hook);
        self
    }

    pub fn after(&mut self, method: ServiceMethodKind, hook: Arc<dyn AfterHook<R>>) -> &mut Self {
        self.after_by_method.entry(method).or_default().push(hook);
        self
    }

    pub fn error_all(&mut self, hook: Arc<dyn ErrorHook<R>>) -> &mut Self {
        self.error_all.push(hook);
        self
    }

    pub fn error(&mut self, method: ServiceMethodKind, hook: Arc<dyn ErrorHook<R>>) -> &mut Self {
        self.error_by_method.entry(method).or_default().push(hook);
        self
    }
}

/// `*_all` hooks first, then the method-specific ones.
pub(crate) fn collect_method_hooks<H: ?Sized>(
    all: &[Arc<H>],
    by_method: &HashMap<ServiceMethodKind, Vec<Arc<H>>>,
    method: ServiceMethodKind,
) -> Vec<Arc<H>> {
    let mut out = all.to_vec();
    if let Some(v) = by_method.get(&method) {
        out.extend(v.iter().cloned());
    }
    out
}

/// Rejects external calls from callers without verified claims.
///
/// Internal calls (`provider == None`) pass.
pub struct RequireAuthenticated;

#[async_trait]
impl AppHook for RequireAuthenticated {
    async fn before(&self, call: CallInfo<'_>) -> Result<()> {
        if call.params.is_internal() || call.params.claims.is_authenticated() {
            return Ok(());
        }
        Err(ServiceError::not_authenticated("Authentication required").into_anyhow())
    }
}
