//! Service registration for the HR app.

use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tenancy_axum::AxumApp;
use tenancy_core::{
    EntityRegistry, IsolationSettings, Record, ServiceMethodKind, StoreService, TenantResolver,
    TenantStore,
};
use validator::Validate;

use crate::records::{
    AttendanceRecord, Department, Employee, EmployeeRef, LeaveRequest, PayrollEntry, Tenant,
};
use crate::validation::Validated;

pub mod references;
pub mod tenants;

use references::MustReference;

fn employee_of<R: EmployeeRef>(data: &R) -> Option<&str> {
    Some(data.employee_id())
}

/// Mounts one in-memory store per record type and hooks up validation.
fn mount<R>(
    ax: AxumApp,
    path: &str,
    registry: &Arc<EntityRegistry>,
    settings: IsolationSettings,
) -> Result<AxumApp>
where
    R: Record + Serialize + DeserializeOwned + Validate,
{
    let store = TenantStore::<R>::in_memory(Arc::clone(registry), settings);
    let ax = ax.use_service::<R>(path, Arc::new(StoreService::new(store)))?;

    ax.app.service::<R>(path.trim_start_matches('/'))?.hooks(|h| {
        h.before(ServiceMethodKind::Create, Arc::new(Validated::<R>::new()));
        h.before(ServiceMethodKind::Update, Arc::new(Validated::<R>::new()));
    });
    Ok(ax)
}

/// Writes that name an employee must name one of the caller's employees.
fn require_employee<R>(ax: &AxumApp, name: &'static str) -> Result<()>
where
    R: Record + EmployeeRef + Send + Sync + 'static,
{
    let hook = Arc::new(MustReference::<R, Employee>::new(
        ax.app.clone(),
        "employees",
        "employee_id",
        employee_of::<R>,
    ));
    ax.app.service::<R>(name)?.hooks(|h| {
        h.before(ServiceMethodKind::Create, hook.clone());
        h.before(ServiceMethodKind::Update, hook.clone());
        h.before(ServiceMethodKind::Patch, hook);
    });
    Ok(())
}

pub fn configure(
    ax: AxumApp,
    registry: Arc<EntityRegistry>,
    settings: IsolationSettings,
    resolver: TenantResolver,
) -> Result<AxumApp> {
    let ax = mount::<Employee>(ax, "/employees", &registry, settings)?;
    let ax = mount::<Department>(ax, "/departments", &registry, settings)?;
    let ax = mount::<LeaveRequest>(ax, "/leave-requests", &registry, settings)?;
    let ax = mount::<AttendanceRecord>(ax, "/attendance", &registry, settings)?;
    let ax = mount::<PayrollEntry>(ax, "/payroll", &registry, settings)?;
    let ax = mount::<Tenant>(ax, "/tenants", &registry, settings)?;

    let department = Arc::new(MustReference::<Employee, Department>::new(
        ax.app.clone(),
        "departments",
        "department_id",
        |e| e.department_id.as_deref(),
    ));
    ax.app.service::<Employee>("employees")?.hooks(|h| {
        h.before(ServiceMethodKind::Create, department.clone());
        h.before(ServiceMethodKind::Update, department.clone());
        h.before(ServiceMethodKind::Patch, department);
    });

    let manager = Arc::new(MustReference::<Department, Employee>::new(
        ax.app.clone(),
        "employees",
        "manager_id",
        |d| d.manager_id.as_deref(),
    ));
    ax.app.service::<Department>("departments")?.hooks(|h| {
        h.before(ServiceMethodKind::Create, manager.clone());
        h.before(ServiceMethodKind::Update, manager.clone());
        h.before(ServiceMethodKind::Patch, manager);
    });

    require_employee::<LeaveRequest>(&ax, "leave-requests")?;
    require_employee::<AttendanceRecord>(&ax, "attendance")?;
    require_employee::<PayrollEntry>(&ax, "payroll")?;

    let admin_only = Arc::new(tenants::RequireAdmin::new(resolver));
    ax.app.service::<Tenant>("tenants")?.hooks(|h| {
        h.before_all(admin_only);
    });

    Ok(ax)
}
