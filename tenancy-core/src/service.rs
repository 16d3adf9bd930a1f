use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::context::TenantScope;
use crate::errors::ServiceError;
use crate::params::Params;
use crate::record::Record;
use crate::store::{Query, TenantStore};

/// Standard service methods: find, get, create, update, patch, remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceMethodKind {
    Find,
    Get,
    Create,
    Update,
    Patch,
    Remove,
}

impl ServiceMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceMethodKind::Find => "find",
            ServiceMethodKind::Get => "get",
            ServiceMethodKind::Create => "create",
            ServiceMethodKind::Update => "update",
            ServiceMethodKind::Patch => "patch",
            ServiceMethodKind::Remove => "remove",
        }
    }
}

/// Methods a service exposes to transports.
#[derive(Debug, Clone)]
pub struct ServiceCapabilities {
    pub allowed_methods: Vec<ServiceMethodKind>,
}

impl ServiceCapabilities {
    pub fn standard_crud() -> Self {
        use ServiceMethodKind::*;
        Self {
            allowed_methods: vec![Find, Get, Create, Update, Patch, Remove],
        }
    }

    pub fn from_methods(methods: Vec<ServiceMethodKind>) -> Self {
        Self {
            allowed_methods: methods,
        }
    }

    pub fn allows(&self, method: ServiceMethodKind) -> bool {
        self.allowed_methods.contains(&method)
    }
}

/// A named collection of records that business code works with.
///
/// Every method receives the request's [`TenantScope`]; implementations pass
/// it straight to a [`TenantStore`] and never inspect the tenant themselves.
/// Unimplemented methods answer `NotImplemented`.
#[async_trait]
pub trait TenantService<R>: Send + Sync
where
    R: Send + 'static,
{
    fn capabilities(&self) -> ServiceCapabilities {
        ServiceCapabilities::standard_crud()
    }

    async fn find(&self, _scope: &TenantScope, _params: Params) -> Result<Vec<R>> {
        Err(ServiceError::not_implemented("Method not implemented: find").into_anyhow())
    }

    async fn get(&self, _scope: &TenantScope, _id: &str, _params: Params) -> Result<R> {
        Err(ServiceError::not_implemented("Method not implemented: get").into_anyhow())
    }

    async fn create(&self, _scope: &TenantScope, _data: R, _params: Params) -> Result<R> {
        Err(ServiceError::not_implemented("Method not implemented: create").into_anyhow())
    }

    /// Full replace.
    async fn update(&self, _scope: &TenantScope, _id: &str, _data: R, _params: Params) -> Result<R> {
        Err(ServiceError::not_implemented("Method not implemented: update").into_anyhow())
    }

    /// Merge a JSON object into the stored record.
    async fn patch(&self, _scope: &TenantScope, _id: &str, _patch: Value, _params: Params) -> Result<R> {
        Err(ServiceError::not_implemented("Method not implemented: patch").into_anyhow())
    }

    async fn remove(&self, _scope: &TenantScope, _id: &str, _params: Params) -> Result<R> {
        Err(ServiceError::not_implemented("Method not implemented: remove").into_anyhow())
    }
}

/// CRUD service backed by a [`TenantStore`].
pub struct StoreService<R: Record> {
    store: TenantStore<R>,
    capabilities: ServiceCapabilities,
}

impl<R: Record> StoreService<R> {
    pub fn new(store: TenantStore<R>) -> Self {
        Self {
            store,
            capabilities: ServiceCapabilities::standard_crud(),
        }
    }
}

/// Shallow JSON merge; `id` is never patched.
fn merge_patch<R>(record: &R, patch: Value) -> Result<R>
where
    R: Serialize + DeserializeOwned,
{
    let Value::Object(patch) = patch else {
        return Err(ServiceError::bad_request("Patch data must be a JSON object").into_anyhow());
    };

    let mut current = serde_json::to_value(record)?;
    if let Some(obj) = current.as_object_mut() {
        for (k, v) in patch {
            if k == "id" {
                continue;
            }
            obj.insert(k, v);
        }
    }

    serde_json::from_value(current).map_err(|e| {
        ServiceError::unprocessable("Patched record is invalid")
            .with_errors(serde_json::json!({ "_schema": [e.to_string()] }))
            .into_anyhow()
    })
}

#[async_trait]
impl<R> TenantService<R> for StoreService<R>
where
    R: Record + Serialize + DeserializeOwned,
{
    fn capabilities(&self) -> ServiceCapabilities {
        self.capabilities.clone()
    }

    async fn find(&self, scope: &TenantScope, params: Params) -> Result<Vec<R>> {
        let mut query = Query::all().skip(params.skip());
        if let Some(limit) = params.limit() {
            query = query.limit(limit);
        }
        self.store.find(scope, &query).await
    }

    async fn get(&self, scope: &TenantScope, id: &str, _params: Params) -> Result<R> {
        self.store.get(scope, id).await
    }

    async fn create(&self, scope: &TenantScope, data: R, _params: Params) -> Result<R> {
        self.store.create(scope, data).await
    }

    async fn update(&self, scope: &TenantScope, id: &str, data: R, _params: Params) -> Result<R> {
        self.store.update(scope, id, data).await
    }

    async fn patch(&self, scope: &TenantScope, id: &str, patch: Value, _params: Params) -> Result<R> {
        let current = self.store.get(scope, id).await?;
        let merged = merge_patch(&current, patch)?;
        self.store.update(scope, id, merged).await
    }

    async fn remove(&self, scope: &TenantScope, id: &str, _params: Params) -> Result<R> {
        self.store.remove(scope, id).await
    }
}
