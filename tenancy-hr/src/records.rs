//! HR record types.
//!
//! Everything except [`Tenant`] belongs to exactly one tenant and carries a
//! `tenant_id` field; the store fills it on create.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tenancy_core::{Record, TenantId};
use validator::{Validate, ValidationError};

/// Implements [`Record`] for a struct with `id`, `tenant_id`, `created_at`
/// and `updated_at` fields.
macro_rules! tenant_owned {
    ($ty:ty, $kind:literal) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;

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
    };
}

/// Hands every persisted record type, grouped by classification, to `$m!`.
///
/// The registry and its shape test both expand from this list, so a record
/// type only needs to be added here.
macro_rules! for_each_record {
    ($m:ident) => {
        $m! {
            tenant: Employee, Department, LeaveRequest, AttendanceRecord, PayrollEntry;
            global: Tenant;
        }
    };
}

pub(crate) use for_each_record;

/// Records that point at an employee of the same tenant.
pub trait EmployeeRef {
    fn employee_id(&self) -> &str;
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Employee {
    pub id: String,
    pub tenant_id: Option<TenantId>,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub department_id: Option<String>,
    pub job_title: Option<String>,
    pub hired_on: Option<NaiveDate>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

tenant_owned!(Employee, "employees");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Department {
    pub id: String,
    pub tenant_id: Option<TenantId>,
    #[validate(length(min = 1))]
    pub name: String,
    pub manager_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

tenant_owned!(Department, "departments");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

fn leave_dates(req: &LeaveRequest) -> Result<(), ValidationError> {
    match (req.starts_on, req.ends_on) {
        (Some(start), Some(end)) if end < start => {
            Err(invalid("dates", "ends_on must not precede starts_on"))
        }
        (Some(_), Some(_)) => Ok(()),
        _ => Err(invalid("dates", "starts_on and ends_on are required")),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "leave_dates"))]
pub struct LeaveRequest {
    pub id: String,
    pub tenant_id: Option<TenantId>,
    #[validate(length(min = 1))]
    pub employee_id: String,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

tenant_owned!(LeaveRequest, "leave_requests");

impl EmployeeRef for LeaveRequest {
    fn employee_id(&self) -> &str {
        &self.employee_id
    }
}

fn shift_order(rec: &AttendanceRecord) -> Result<(), ValidationError> {
    match (rec.clock_in, rec.clock_out) {
        (Some(start), Some(end)) if end < start => {
            Err(invalid("shift", "clock_out must not precede clock_in"))
        }
        (None, Some(_)) => Err(invalid("shift", "clock_out requires clock_in")),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "shift_order"))]
pub struct AttendanceRecord {
    pub id: String,
    pub tenant_id: Option<TenantId>,
    #[validate(length(min = 1))]
    pub employee_id: String,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

tenant_owned!(AttendanceRecord, "attendance");

impl EmployeeRef for AttendanceRecord {
    fn employee_id(&self) -> &str {
        &self.employee_id
    }
}

/// One pay period for one employee. Amounts are in minor units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PayrollEntry {
    pub id: String,
    pub tenant_id: Option<TenantId>,
    #[validate(length(min = 1))]
    pub employee_id: String,
    /// `YYYY-MM`
    #[validate(length(equal = 7))]
    pub period: String,
    #[validate(range(min = 0))]
    pub gross_cents: i64,
    #[validate(range(min = 0))]
    pub net_cents: i64,
    #[validate(length(equal = 3))]
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

tenant_owned!(PayrollEntry, "payroll");

impl EmployeeRef for PayrollEntry {
    fn employee_id(&self) -> &str {
        &self.employee_id
    }
}

/// Entry in the platform's tenant directory. Shared by all tenants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Tenant {
    /// The tenant's id, as carried in access tokens.
    pub id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub slug: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Tenant {
    const KIND: &'static str = "tenants";

    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
    fn stamp_created(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> Option<NaiveDate> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn leave_dates_must_be_ordered() {
        let mut req = LeaveRequest {
            employee_id: "e1".into(),
            starts_on: date("2026-07-10"),
            ends_on: date("2026-07-01"),
            ..LeaveRequest::default()
        };
        assert!(req.validate().is_err());

        req.ends_on = date("2026-07-14");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn employee_email_is_checked() {
        let employee = Employee {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "not-an-email".into(),
            ..Employee::default()
        };
        let errs = employee.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("email"));
    }

    #[test]
    fn leave_status_serializes_lowercase() {
        let value = serde_json::to_value(LeaveRequest::default()).unwrap();
        assert_eq!(value["status"], "pending");
    }
}
