use anyhow::Result;
use tenancy_core::EntityRegistry;

use crate::records::{
    for_each_record, AttendanceRecord, Department, Employee, LeaveRequest, PayrollEntry, Tenant,
};

macro_rules! classify {
    (tenant: $($t:ty),* ; global: $($g:ty),* ;) => {
        EntityRegistry::builder()
            $(.tenant_scoped::<$t>())*
            $(.global::<$g>())*
            .build()
    };
}

/// Classification of every record type the HR app persists.
///
/// A type missing here cannot be read or written at all.
pub fn entity_registry() -> Result<EntityRegistry> {
    for_each_record!(classify)
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use tenancy_core::{Record, Scope};

    use super::*;

    fn has_tenant_field<R: Default + Serialize>() -> bool {
        serde_json::to_value(R::default())
            .unwrap()
            .get("tenant_id")
            .is_some()
    }

    fn agrees<R: Record + Default + Serialize>(registry: &EntityRegistry, listed: Scope) {
        assert_eq!(
            registry.scope_of(R::KIND),
            Some(listed),
            "`{}` is not registered as listed",
            R::KIND
        );
        assert_eq!(
            registry.is_tenant_scoped(R::KIND),
            has_tenant_field::<R>(),
            "`{}` classification disagrees with its fields",
            R::KIND
        );
    }

    macro_rules! check_all {
        (tenant: $($t:ty),* ; global: $($g:ty),* ;) => {{
            let registry = entity_registry().unwrap();
            let mut listed = 0usize;
            $( agrees::<$t>(&registry, Scope::Tenant); listed += 1; )*
            $( agrees::<$g>(&registry, Scope::Global); listed += 1; )*
            assert_eq!(registry.kinds().count(), listed);
        }};
    }

    #[test]
    fn classification_matches_record_shapes() {
        for_each_record!(check_all);
    }
}
