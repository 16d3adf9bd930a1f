//! Demo data for local runs (`TENANCY__SEED__DEMO=true`).

use anyhow::Result;
use tenancy_core::{App, Params, TenantId, TenantScope};
use tracing::info;

use crate::records::{Department, Employee, PayrollEntry, Tenant};

const DEMO_TENANTS: &[(&str, &str, &[(&str, &str)])] = &[
    ("Acme Corp", "acme", &[("Wile", "Coyote"), ("Road", "Runner")]),
    ("Globex", "globex", &[("Hank", "Scorpio")]),
];

/// Creates the demo tenants and their staff. Returns the tenant ids in
/// creation order.
pub async fn demo(app: &App) -> Result<Vec<TenantId>> {
    let platform = TenantScope::platform();
    let tenants = app.service::<Tenant>("tenants")?;
    let departments = app.service::<Department>("departments")?;
    let employees = app.service::<Employee>("employees")?;
    let payroll = app.service::<PayrollEntry>("payroll")?;

    let mut ids = Vec::with_capacity(DEMO_TENANTS.len());
    for (name, slug, staff) in DEMO_TENANTS {
        let tenant_id = TenantId::generate();
        tenants
            .create(
                &platform,
                Tenant {
                    id: tenant_id.to_string(),
                    name: name.to_string(),
                    slug: slug.to_string(),
                    ..Tenant::default()
                },
                Params::internal(),
            )
            .await?;

        let scope = TenantScope::for_tenant(tenant_id);
        let department = departments
            .create(
                &scope,
                Department {
                    name: "Operations".to_string(),
                    ..Department::default()
                },
                Params::internal(),
            )
            .await?;

        for (first, last) in staff.iter() {
            let employee = employees
                .create(
                    &scope,
                    Employee {
                        first_name: first.to_string(),
                        last_name: last.to_string(),
                        email: format!("{}@{slug}.example", first.to_lowercase()),
                        department_id: Some(department.id.clone()),
                        ..Employee::default()
                    },
                    Params::internal(),
                )
                .await?;

            // Platform-side write: the owner comes from the record itself.
            payroll
                .create(
                    &platform,
                    PayrollEntry {
                        tenant_id: Some(tenant_id),
                        employee_id: employee.id,
                        period: "2026-09".to_string(),
                        gross_cents: 500_000,
                        net_cents: 380_000,
                        currency: "EUR".to_string(),
                        ..PayrollEntry::default()
                    },
                    Params::internal(),
                )
                .await?;
        }

        info!(tenant_id = %tenant_id, tenant = name, employees = staff.len(), "seeded demo tenant");
        ids.push(tenant_id);
    }

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use tenancy_core::Config;
    use tracing_test::traced_test;

    use super::*;

    fn test_config() -> Config {
        let mut config = Config::new();
        config.set("auth.jwt.secret", "seed-test-secret");
        config
    }

    #[tokio::test]
    #[traced_test]
    async fn seeded_rows_stay_with_their_tenant() {
        let ax = crate::build(test_config()).unwrap();
        let ids = demo(&ax.app).await.unwrap();
        assert_eq!(ids.len(), 2);

        let employees = ax.app.service::<Employee>("employees").unwrap();
        let payroll = ax.app.service::<PayrollEntry>("payroll").unwrap();

        for (tenant_id, (_, _, staff)) in ids.iter().zip(DEMO_TENANTS) {
            let scope = TenantScope::for_tenant(*tenant_id);
            let visible = employees.find(&scope, Params::internal()).await.unwrap();
            assert_eq!(visible.len(), staff.len());
            assert!(visible.iter().all(|e| e.tenant_id == Some(*tenant_id)));

            let pay = payroll.find(&scope, Params::internal()).await.unwrap();
            assert_eq!(pay.len(), staff.len());
        }

        let all = employees
            .find(&TenantScope::platform(), Params::internal())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert!(logs_contain("seeded demo tenant"));
    }
}
