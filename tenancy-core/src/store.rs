//! Isolation-enforcing data access layer.
//!
//! [`TenantStore`] is the only handle services get to a record collection.
//! It builds the isolation predicate from the [`TenantScope`] each time an
//! operation runs and stamps the owning tenant onto new records, so no
//! call site has to remember either.
//!
//! Reads of another tenant's record behave exactly like reads of a missing
//! record: the filtered result is empty and `get` reports `NotFound`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{MemoryBackend, Predicate, RecordBackend, RowFilter};
use crate::config::ConfigSnapshot;
use crate::context::TenantScope;
use crate::errors::{IsolationError, ServiceError, ServiceResult};
use crate::record::Record;
use crate::registry::{EntityRegistry, Scope};
use crate::tenant::TenantId;

/// What to do when a new record already names a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StampPolicy {
    /// Only fill an empty tenant id; a caller-supplied one is kept.
    #[default]
    FillEmpty,
    /// Always replace with the active tenant when there is one.
    Overwrite,
    /// Refuse records whose tenant differs from the active tenant.
    RejectMismatch,
}

impl FromStr for StampPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fill_empty" => Ok(StampPolicy::FillEmpty),
            "overwrite" => Ok(StampPolicy::Overwrite),
            "reject_mismatch" => Ok(StampPolicy::RejectMismatch),
            other => Err(anyhow!("unknown stamp policy `{other}`")),
        }
    }
}

impl fmt::Display for StampPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StampPolicy::FillEmpty => "fill_empty",
            StampPolicy::Overwrite => "overwrite",
            StampPolicy::RejectMismatch => "reject_mismatch",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsolationSettings {
    pub stamp_policy: StampPolicy,
}

impl IsolationSettings {
    /// Reads `isolation.stamp_policy`; an unknown value is a startup error.
    pub fn from_config(config: &ConfigSnapshot) -> anyhow::Result<Self> {
        let stamp_policy = match config.get("isolation.stamp_policy") {
            Some(raw) => raw.parse()?,
            None => StampPolicy::default(),
        };
        Ok(Self { stamp_policy })
    }
}

/// Business-level read: optional predicate plus pagination.
///
/// The isolation predicate is never part of a `Query`; the store adds it.
pub struct Query<R> {
    predicate: Option<Arc<Predicate<R>>>,
    skip: usize,
    limit: Option<usize>,
}

impl<R> Clone for Query<R> {
    fn clone(&self) -> Self {
        Self {
            predicate: self.predicate.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }
}

impl<R> Default for Query<R> {
    fn default() -> Self {
        Self {
            predicate: None,
            skip: 0,
            limit: None,
        }
    }
}

impl<R> Query<R> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(f));
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
}

pub struct TenantStore<R: Record> {
    backend: Arc<dyn RecordBackend<R>>,
    registry: Arc<EntityRegistry>,
    settings: IsolationSettings,
}

impl<R: Record> Clone for TenantStore<R> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            registry: Arc::clone(&self.registry),
            settings: self.settings,
        }
    }
}

impl<R: Record> TenantStore<R> {
    pub fn new(
        backend: Arc<dyn RecordBackend<R>>,
        registry: Arc<EntityRegistry>,
        settings: IsolationSettings,
    ) -> Self {
        Self {
            backend,
            registry,
            settings,
        }
    }

    pub fn in_memory(registry: Arc<EntityRegistry>, settings: IsolationSettings) -> Self {
        Self::new(Arc::new(MemoryBackend::<R>::new()), registry, settings)
    }

    pub fn settings(&self) -> IsolationSettings {
        self.settings
    }

    fn classification(&self) -> Result<Scope, IsolationError> {
        self.registry
            .scope_of(R::KIND)
            .ok_or(IsolationError::UnclassifiedRecord { kind: R::KIND })
    }

    /// Isolation predicate for an operation starting now.
    fn tenant_predicate(&self, scope: &TenantScope) -> Result<Option<TenantId>, IsolationError> {
        Ok(match self.classification()? {
            Scope::Tenant => scope.tenant_id(),
            Scope::Global => None,
        })
    }

    fn not_found(id: &str) -> anyhow::Error {
        ServiceError::not_found(format!("No record found for id '{id}'")).into_anyhow()
    }

    pub async fn find(&self, scope: &TenantScope, query: &Query<R>) -> ServiceResult<Vec<R>> {
        let tenant = self.tenant_predicate(scope)?;
        let filter = RowFilter {
            tenant,
            id: None,
            predicate: query.predicate.as_deref(),
            skip: query.skip,
            limit: query.limit,
        };

        let mut rows = self.backend.select(&filter).await?;
        // A backend may only narrow the result, never widen it.
        if let Some(tenant) = tenant {
            rows.retain(|row| row.tenant_id() == Some(tenant));
        }

        debug!(kind = R::KIND, tenant_id = ?tenant, count = rows.len(), "find");
        Ok(rows)
    }

    pub async fn get(&self, scope: &TenantScope, id: &str) -> ServiceResult<R> {
        let tenant = self.tenant_predicate(scope)?;
        let filter = RowFilter {
            tenant,
            id: Some(id),
            predicate: None,
            skip: 0,
            limit: Some(1),
        };

        let row = self
            .backend
            .select(&filter)
            .await?
            .into_iter()
            .find(|row| row.id() == id && tenant.map_or(true, |t| row.tenant_id() == Some(t)));

        debug!(kind = R::KIND, tenant_id = ?tenant, id, hit = row.is_some(), "get");
        row.ok_or_else(|| Self::not_found(id))
    }

    pub async fn create(&self, scope: &TenantScope, mut record: R) -> ServiceResult<R> {
        match self.classification()? {
            Scope::Tenant => {
                self.stamp_owner(scope, &mut record)?;
                // Caller ids are ignored; ids must not collide across tenants.
                record.set_id(Uuid::new_v4().to_string());
            }
            Scope::Global if record.id().trim().is_empty() => {
                record.set_id(Uuid::new_v4().to_string());
            }
            Scope::Global => {}
        }

        let now = Utc::now();
        record.stamp_created(now);
        record.stamp_updated(now);

        let created = self.backend.insert(record).await?;
        debug!(kind = R::KIND, tenant_id = ?created.tenant_id(), id = created.id(), "create");
        Ok(created)
    }

    /// Full replace. The stored owner and creation time are kept.
    pub async fn update(&self, scope: &TenantScope, id: &str, record: R) -> ServiceResult<R> {
        let existing = self.get(scope, id).await?;
        self.write_back(scope, &existing, record).await
    }

    pub async fn remove(&self, scope: &TenantScope, id: &str) -> ServiceResult<R> {
        let tenant = self.tenant_predicate(scope)?;
        let filter = RowFilter {
            tenant,
            id: Some(id),
            predicate: None,
            skip: 0,
            limit: None,
        };

        let removed = self.backend.delete(id, &filter).await?;
        debug!(kind = R::KIND, tenant_id = ?tenant, id, hit = removed.is_some(), "remove");
        removed.ok_or_else(|| Self::not_found(id))
    }

    async fn write_back(&self, scope: &TenantScope, existing: &R, mut next: R) -> ServiceResult<R> {
        let id = existing.id().to_string();
        next.set_id(id.clone());

        if let Some(owner) = existing.tenant_id() {
            self.keep_owner(owner, &mut next)?;
        }
        if let Some(created) = existing.created_at() {
            next.stamp_created(created);
        }
        next.stamp_updated(Utc::now());

        let filter = RowFilter {
            tenant: self.tenant_predicate(scope)?,
            id: Some(&id),
            predicate: None,
            skip: 0,
            limit: None,
        };

        // The row can vanish between read and write.
        self.backend
            .replace(next, &filter)
            .await?
            .ok_or_else(|| Self::not_found(&id))
    }

    /// Decide the owner of a new tenant-scoped record.
    fn stamp_owner(&self, scope: &TenantScope, record: &mut R) -> Result<(), IsolationError> {
        let kind = R::KIND;
        let owner = match (record.tenant_id(), scope.tenant_id()) {
            (None, Some(active)) => active,
            (None, None) => return Err(IsolationError::MissingTenantContext { kind }),
            // Trusted internal callers (seeding, migrations) supply the owner.
            (Some(own), None) => own,
            (Some(own), Some(active)) if own == active => own,
            (Some(own), Some(active)) => match self.settings.stamp_policy {
                StampPolicy::FillEmpty => {
                    warn!(
                        kind,
                        record_tenant = %own,
                        active_tenant = %active,
                        "keeping caller-supplied tenant id that differs from the active tenant"
                    );
                    own
                }
                StampPolicy::Overwrite => active,
                StampPolicy::RejectMismatch => {
                    return Err(IsolationError::TenantMismatch {
                        kind,
                        record: own,
                        context: active,
                    })
                }
            },
        };

        if record.set_tenant_id(owner) {
            Ok(())
        } else {
            Err(IsolationError::StampingUnsupported { kind })
        }
    }

    /// Owners are assigned once; later writes cannot move a record.
    fn keep_owner(&self, owner: TenantId, next: &mut R) -> Result<(), IsolationError> {
        match next.tenant_id() {
            Some(requested) if requested != owner => {
                if self.settings.stamp_policy == StampPolicy::RejectMismatch {
                    return Err(IsolationError::TenantMismatch {
                        kind: R::KIND,
                        record: requested,
                        context: owner,
                    });
                }
                warn!(
                    kind = R::KIND,
                    owner = %owner,
                    requested = %requested,
                    "ignoring attempt to reassign record tenant"
                );
            }
            _ => {}
        }

        if next.set_tenant_id(owner) {
            Ok(())
        } else {
            Err(IsolationError::StampingUnsupported { kind: R::KIND })
        }
    }
}
