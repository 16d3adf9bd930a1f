//! Persisted record types.

use chrono::{DateTime, Utc};

use crate::tenant::TenantId;

/// A record type the data access layer can persist.
///
/// `KIND` is the stable name the [`EntityRegistry`](crate::EntityRegistry)
/// classifies. Tenant-owned types override the tenant accessors; the
/// defaults describe a type without a tenant field.
pub trait Record: Clone + Send + Sync + 'static {
    const KIND: &'static str;

    /// Primary id; empty until assigned.
    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Owning tenant, `None` when unset or not applicable.
    fn tenant_id(&self) -> Option<TenantId> {
        None
    }

    /// Assign the owning tenant. Returns `false` if the type has no tenant field.
    fn set_tenant_id(&mut self, _tenant: TenantId) -> bool {
        false
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn stamp_created(&mut self, _at: DateTime<Utc>) {}

    fn stamp_updated(&mut self, _at: DateTime<Utc>) {}
}

#[cfg(test)]
pub(crate) mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    /// Tenant-owned fixture.
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    pub struct Note {
        pub id: String,
        pub tenant_id: Option<TenantId>,
        pub body: String,
        pub created_at: Option<DateTime<Utc>>,
        pub updated_at: Option<DateTime<Utc>>,
    }

    impl Note {
        pub fn new(body: &str) -> Self {
            Self {
                body: body.to_string(),
                ..Self::default()
            }
        }
    }

    impl Record for Note {
        const KIND: &'static str = "notes";

        fn id(&self) -> &str {
            &self.id
        }
        fn set_id(&mut self, id: String) {
            self.id = id;
        }
        fn tenant_id(&self) -> Option<TenantId> {
            self.tenant_id
        }
        fn set_tenant_id(&mut self, tenant: TenantId) -> bool {
            self.tenant_id = Some(tenant);
            true
        }
        fn created_at(&self) -> Option<DateTime<Utc>> {
            self.created_at
        }
        fn stamp_created(&mut self, at: DateTime<Utc>) {
            self.created_at = Some(at);
        }
        fn stamp_updated(&mut self, at: DateTime<Utc>) {
            self.updated_at = Some(at);
        }
    }

    /// Platform-wide fixture without a tenant field.
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Setting {
        pub id: String,
        pub value: String,
    }

    impl Record for Setting {
        const KIND: &'static str = "settings";

        fn id(&self) -> &str {
            &self.id
        }
        fn set_id(&mut self, id: String) {
            self.id = id;
        }
    }
}
