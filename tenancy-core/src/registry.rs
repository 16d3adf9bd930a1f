//! Tenant-scoped entity classification.
//!
//! The registry is enumerated once at startup and is read-only afterwards,
//! so it is shared between requests behind an `Arc` without locking.
//! Every record kind the data access layer touches must be classified here;
//! an unclassified kind is refused rather than read unfiltered.

use std::collections::BTreeMap;

use anyhow::{bail, Result};

use crate::record::Record;

/// How a record kind relates to tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Carries a tenant id and is isolated per tenant.
    Tenant,
    /// Shared platform data (e.g. the tenant directory itself).
    Global,
}

#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    kinds: BTreeMap<&'static str, Scope>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::default()
    }

    /// Classification of `kind`, `None` when it was never registered.
    pub fn scope_of(&self, kind: &str) -> Option<Scope> {
        self.kinds.get(kind).copied()
    }

    pub fn is_tenant_scoped(&self, kind: &str) -> bool {
        self.scope_of(kind) == Some(Scope::Tenant)
    }

    pub fn kinds(&self) -> impl Iterator<Item = (&'static str, Scope)> + '_ {
        self.kinds.iter().map(|(k, s)| (*k, *s))
    }

    pub fn tenant_scoped_kinds(&self) -> Vec<&'static str> {
        self.kinds()
            .filter(|(_, scope)| *scope == Scope::Tenant)
            .map(|(kind, _)| kind)
            .collect()
    }
}

/// Collects classifications; `build` fails on a kind registered twice.
#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    entries: Vec<(&'static str, Scope)>,
}

impl EntityRegistryBuilder {
    pub fn tenant_scoped<R: Record>(mut self) -> Self {
        self.entries.push((R::KIND, Scope::Tenant));
        self
    }

    pub fn global<R: Record>(mut self) -> Self {
        self.entries.push((R::KIND, Scope::Global));
        self
    }

    pub fn build(self) -> Result<EntityRegistry> {
        let mut kinds = BTreeMap::new();
        for (kind, scope) in self.entries {
            if kinds.insert(kind, scope).is_some() {
                bail!("record kind `{kind}` registered more than once");
            }
        }
        tracing::debug!(kinds = kinds.len(), "entity registry built");
        Ok(EntityRegistry { kinds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::{Note, Setting};

    #[test]
    fn classifies_registered_kinds() {
        let registry = EntityRegistry::builder()
            .tenant_scoped::<Note>()
            .global::<Setting>()
            .build()
            .unwrap();

        assert_eq!(registry.scope_of("notes"), Some(Scope::Tenant));
        assert_eq!(registry.scope_of("settings"), Some(Scope::Global));
        assert_eq!(registry.scope_of("widgets"), None);
        assert!(registry.is_tenant_scoped("notes"));
        assert_eq!(registry.tenant_scoped_kinds(), vec!["notes"]);
    }

    #[test]
    fn duplicate_registration_fails() {
        let err = EntityRegistry::builder()
            .tenant_scoped::<Note>()
            .global::<Note>()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("notes"));
    }
}
