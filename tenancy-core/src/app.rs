use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, ConfigSnapshot};
use crate::context::TenantScope;
use crate::errors::ServiceError;
use crate::hooks::{collect_method_hooks, AppHook, HookContext, HookResult, ServiceHooks};
use crate::params::Params;
use crate::service::{ServiceCapabilities, ServiceMethodKind, TenantService};

struct ServiceEntry<R: Send + 'static> {
    service: Arc<dyn TenantService<R>>,
    hooks: RwLock<ServiceHooks<R>>,
}

struct AppInner {
    // name -> Arc<ServiceEntry<R>> for the R it was registered with
    services: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    app_hooks: RwLock<Vec<Arc<dyn AppHook>>>,
    config: RwLock<Config>,
}

/// Application container: named services, hooks and config.
///
/// Services of different record types live side by side; callers look
/// them up with the record type they were registered with.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(AppInner {
                services: RwLock::new(HashMap::new()),
                app_hooks: RwLock::new(Vec::new()),
                config: RwLock::new(config),
            }),
        }
    }

    /// Register `service` under `name`. Names are unique.
    pub fn register<R>(&self, name: impl Into<String>, service: Arc<dyn TenantService<R>>) -> Result<()>
    where
        R: Send + Sync + 'static,
    {
        let name = name.into();
        let mut services = self.inner.services.write();
        if services.contains_key(&name) {
            anyhow::bail!("service '{name}' is already registered");
        }

        let entry: Arc<ServiceEntry<R>> = Arc::new(ServiceEntry {
            service,
            hooks: RwLock::new(ServiceHooks::new()),
        });
        debug!(service = %name, "service registered");
        services.insert(name, entry);
        Ok(())
    }

    /// Add a hook that runs before every service call.
    pub fn hook(&self, hook: Arc<dyn AppHook>) {
        self.inner.app_hooks.write().push(hook);
    }

    pub fn service<R>(&self, name: &str) -> Result<ServiceHandle<R>>
    where
        R: Send + Sync + 'static,
    {
        let any = self
            .inner
            .services
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(format!("Service '{name}' not found")).into_anyhow())?;

        let entry = any.downcast::<ServiceEntry<R>>().map_err(|_| {
            ServiceError::general_error(format!(
                "Service '{name}' was registered with a different record type"
            ))
            .into_anyhow()
        })?;

        Ok(ServiceHandle {
            app: self.clone(),
            name: name.to_string(),
            entry,
        })
    }

    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.config.write().set(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.config.read().get(key).map(str::to_string)
    }

    pub fn config_snapshot(&self) -> ConfigSnapshot {
        self.inner.config.read().snapshot()
    }
}

/// Typed handle to one registered service. Calls run the hook pipeline.
pub struct ServiceHandle<R: Send + 'static> {
    app: App,
    name: String,
    entry: Arc<ServiceEntry<R>>,
}

impl<R: Send + 'static> Clone for ServiceHandle<R> {
    fn clone(&self) -> Self {
        Self {
            app: self.app.clone(),
            name: self.name.clone(),
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<R> ServiceHandle<R>
where
    R: Send + Sync + 'static,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> ServiceCapabilities {
        self.entry.service.capabilities()
    }

    /// `app.service("x")?.hooks(|h| { ... })`
    pub fn hooks<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut ServiceHooks<R>),
    {
        f(&mut self.entry.hooks.write());
        self
    }

    fn context(&self, scope: &TenantScope, method: ServiceMethodKind, params: Params) -> HookContext<R> {
        HookContext::new(
            scope.clone(),
            self.name.clone(),
            method,
            params,
            self.app.config_snapshot(),
        )
    }

    /// app hooks -> before -> service -> after, then error hooks on failure.
    async fn run(&self, mut ctx: HookContext<R>) -> Result<HookContext<R>> {
        let method = ctx.method;
        let app_hooks: Vec<Arc<dyn AppHook>> = self.app.inner.app_hooks.read().clone();
        let (before, after, error) = {
            let h = self.entry.hooks.read();
            (
                collect_method_hooks(&h.before_all, &h.before_by_method, method),
                collect_method_hooks(&h.after_all, &h.after_by_method, method),
                collect_method_hooks(&h.error_all, &h.error_by_method, method),
            )
        };

        debug!(
            service = %self.name,
            method = method.as_str(),
            tenant_id = ?ctx.scope.tenant_id(),
            "service call"
        );

        let outcome = async {
            for h in &app_hooks {
                h.before(ctx.call()).await?;
            }
            for h in &before {
                h.run(&mut ctx).await?;
            }
            self.dispatch(&mut ctx).await?;
            for h in &after {
                h.run(&mut ctx).await?;
            }
            Ok::<(), anyhow::Error>(())
        }
        .await;

        if let Err(e) = outcome {
            debug!(service = %self.name, method = method.as_str(), error = %e, "service call failed");
            ctx.error = Some(e);
            for h in &error {
                if let Err(hook_err) = h.run(&mut ctx).await {
                    debug!(error = %hook_err, "error hook failed");
                }
            }
            if let Some(err) = ctx.error.take() {
                return Err(err);
            }
        }

        Ok(ctx)
    }

    async fn dispatch(&self, ctx: &mut HookContext<R>) -> Result<()> {
        let svc = &self.entry.service;
        let result = match ctx.method {
            ServiceMethodKind::Find => {
                HookResult::Many(svc.find(&ctx.scope, ctx.params.clone()).await?)
            }
            ServiceMethodKind::Get => {
                let id = required_id(ctx)?;
                HookResult::One(svc.get(&ctx.scope, &id, ctx.params.clone()).await?)
            }
            ServiceMethodKind::Create => {
                let data = required_data(ctx)?;
                HookResult::One(svc.create(&ctx.scope, data, ctx.params.clone()).await?)
            }
            ServiceMethodKind::Update => {
                let id = required_id(ctx)?;
                let data = required_data(ctx)?;
                HookResult::One(svc.update(&ctx.scope, &id, data, ctx.params.clone()).await?)
            }
            ServiceMethodKind::Patch => {
                let id = required_id(ctx)?;
                let patch = ctx
                    .patch
                    .take()
                    .ok_or_else(|| ServiceError::bad_request("patch requires data").into_anyhow())?;
                HookResult::One(svc.patch(&ctx.scope, &id, patch, ctx.params.clone()).await?)
            }
            ServiceMethodKind::Remove => {
                let id = required_id(ctx)?;
                HookResult::One(svc.remove(&ctx.scope, &id, ctx.params.clone()).await?)
            }
        };
        ctx.result = Some(result);
        Ok(())
    }

    pub async fn find(&self, scope: &TenantScope, params: Params) -> Result<Vec<R>> {
        let ctx = self.context(scope, ServiceMethodKind::Find, params);
        many(self.run(ctx).await?)
    }

    pub async fn get(&self, scope: &TenantScope, id: &str, params: Params) -> Result<R> {
        let mut ctx = self.context(scope, ServiceMethodKind::Get, params);
        ctx.id = Some(id.to_string());
        one(self.run(ctx).await?)
    }

    pub async fn create(&self, scope: &TenantScope, data: R, params: Params) -> Result<R> {
        let mut ctx = self.context(scope, ServiceMethodKind::Create, params);
        ctx.data = Some(data);
        one(self.run(ctx).await?)
    }

    pub async fn update(&self, scope: &TenantScope, id: &str, data: R, params: Params) -> Result<R> {
        let mut ctx = self.context(scope, ServiceMethodKind::Update, params);
        ctx.id = Some(id.to_string());
        ctx.data = Some(data);
        one(self.run(ctx).await?)
    }

    pub async fn patch(&self, scope: &TenantScope, id: &str, patch: Value, params: Params) -> Result<R> {
        let mut ctx = self.context(scope, ServiceMethodKind::Patch, params);
        ctx.id = Some(id.to_string());
        ctx.patch = Some(patch);
        one(self.run(ctx).await?)
    }

    pub async fn remove(&self, scope: &TenantScope, id: &str, params: Params) -> Result<R> {
        let mut ctx = self.context(scope, ServiceMethodKind::Remove, params);
        ctx.id = Some(id.to_string());
        one(self.run(ctx).await?)
    }
}

fn required_id<R>(ctx: &HookContext<R>) -> Result<String> {
    ctx.id.clone().ok_or_else(|| {
        ServiceError::bad_request(format!("{} requires an id", ctx.method.as_str())).into_anyhow()
    })
}

fn required_data<R>(ctx: &mut HookContext<R>) -> Result<R> {
    ctx.data.take().ok_or_else(|| {
        ServiceError::bad_request(format!("{} requires data", ctx.method.as_str())).into_anyhow()
    })
}

fn one<R>(ctx: HookContext<R>) -> Result<R> {
    match ctx.result {
        Some(HookResult::One(v)) => Ok(v),
        Some(HookResult::Many(_)) => Err(ServiceError::general_error(format!(
            "{}() produced many results",
            ctx.method.as_str()
        ))
        .into_anyhow()),
        None => Err(ServiceError::general_error(format!(
            "{}() produced no result",
            ctx.method.as_str()
        ))
        .into_anyhow()),
    }
}

fn many<R>(ctx: HookContext<R>) -> Result<Vec<R>> {
    match ctx.result {
        Some(HookResult::Many(v)) => Ok(v),
        Some(HookResult::One(v)) => Ok(vec![v]),
        None => Ok(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::claims::VerifiedClaims;
    use crate::hooks::{AfterHook, BeforeHook, ErrorHook, RequireAuthenticated};
    use crate::record::tests::Note;
    use crate::registry::EntityRegistry;
    use crate::service::StoreService;
    use crate::store::{IsolationSettings, TenantStore};
    use crate::tenant::TenantId;

    fn app_with_notes() -> App {
        let registry = Arc::new(EntityRegistry::builder().tenant_scoped::<Note>().build().unwrap());
        let store = TenantStore::<Note>::in_memory(registry, IsolationSettings::default());
        let app = App::new();
        app.register::<Note>("notes", Arc::new(StoreService::new(store)))
            .unwrap();
        app
    }

    struct Shout;

    #[async_trait]
    impl BeforeHook<Note> for Shout {
        async fn run(&self, ctx: &mut HookContext<Note>) -> Result<()> {
            if let Some(note) = ctx.data.as_mut() {
                note.body = note.body.to_uppercase();
            }
            Ok(())
        }
    }

    struct Redact;

    #[async_trait]
    impl AfterHook<Note> for Redact {
        async fn run(&self, ctx: &mut HookContext<Note>) -> Result<()> {
            if let Some(HookResult::Many(rows)) = ctx.result.as_mut() {
                for row in rows {
                    row.body = "***".into();
                }
            }
            Ok(())
        }
    }

    struct MissingIsEmpty;

    #[async_trait]
    impl ErrorHook<Note> for MissingIsEmpty {
        async fn run(&self, ctx: &mut HookContext<Note>) -> Result<()> {
            let not_found = ctx
                .error
                .as_ref()
                .and_then(ServiceError::find)
                .is_some_and(|e| e.code() == 404);
            if not_found {
                ctx.error = None;
                ctx.result = Some(HookResult::One(Note::new("placeholder")));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn pipeline_runs_hooks_around_the_service() {
        let app = app_with_notes();
        let notes = app
            .service::<Note>("notes")
            .unwrap()
            .hooks(|h| {
                h.before(ServiceMethodKind::Create, Arc::new(Shout))
                    .after(ServiceMethodKind::Find, Arc::new(Redact));
            });
        let scope = TenantScope::for_tenant(TenantId::generate());

        let created = notes
            .create(&scope, Note::new("hello"), Params::internal())
            .await
            .unwrap();
        assert_eq!(created.body, "HELLO");
        assert_eq!(created.tenant_id, scope.tenant_id());

        let listed = notes.find(&scope, Params::internal()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].body, "***");
    }

    #[tokio::test]
    async fn error_hooks_can_recover() {
        let app = app_with_notes();
        let notes = app
            .service::<Note>("notes")
            .unwrap()
            .hooks(|h| {
                h.error(ServiceMethodKind::Get, Arc::new(MissingIsEmpty));
            });
        let scope = TenantScope::for_tenant(TenantId::generate());

        let got = notes.get(&scope, "nope", Params::internal()).await.unwrap();
        assert_eq!(got.body, "placeholder");

        let err = notes.remove(&scope, "nope", Params::internal()).await.unwrap_err();
        assert_eq!(ServiceError::find(&err).unwrap().code(), 404);
    }

    #[tokio::test]
    async fn app_hooks_run_before_service_hooks() {
        let app = app_with_notes();
        app.hook(Arc::new(RequireAuthenticated));
        let notes = app.service::<Note>("notes").unwrap();
        let scope = TenantScope::platform();

        let anonymous = Params::external("rest", HashMap::new(), VerifiedClaims::anonymous());
        let err = notes.find(&scope, anonymous).await.unwrap_err();
        assert_eq!(ServiceError::find(&err).unwrap().code(), 401);

        assert!(notes.find(&scope, Params::internal()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn patch_merges_into_the_stored_record() {
        let app = app_with_notes();
        let notes = app.service::<Note>("notes").unwrap();
        let scope = TenantScope::for_tenant(TenantId::generate());
        let created = notes
            .create(&scope, Note::new("draft"), Params::internal())
            .await
            .unwrap();

        let patched = notes
            .patch(
                &scope,
                &created.id,
                serde_json::json!({ "body": "final", "id": "hijack" }),
                Params::internal(),
            )
            .await
            .unwrap();
        assert_eq!(patched.id, created.id);
        assert_eq!(patched.body, "final");
        assert_eq!(patched.tenant_id, scope.tenant_id());

        let err = notes
            .patch(&scope, &created.id, serde_json::json!(["x"]), Params::internal())
            .await
            .unwrap_err();
        assert_eq!(ServiceError::find(&err).unwrap().code(), 400);
    }

    #[test]
    fn lookups_check_name_and_record_type() {
        let app = app_with_notes();

        let missing = app.service::<Note>("ghosts").err().unwrap();
        assert_eq!(ServiceError::find(&missing).unwrap().code(), 404);

        let wrong_type = app.service::<String>("notes").err().unwrap();
        assert_eq!(ServiceError::find(&wrong_type).unwrap().code(), 500);

        let registry = Arc::new(EntityRegistry::builder().tenant_scoped::<Note>().build().unwrap());
        let again = StoreService::new(TenantStore::<Note>::in_memory(registry, IsolationSettings::default()));
        assert!(app.register::<Note>("notes", Arc::new(again)).is_err());
        assert_eq!(app.service_names(), vec!["notes".to_string()]);
    }

    #[test]
    fn config_is_shared_by_clones() {
        let app = App::new();
        let clone = app.clone();
        clone.set("isolation.stamp_policy", "overwrite");
        assert_eq!(app.get("isolation.stamp_policy").as_deref(), Some("overwrite"));
        assert_eq!(
            app.config_snapshot().get("isolation.stamp_policy"),
            Some("overwrite")
        );
    }
}
