//! Multi-tenant HR backend built on tenancy-core.
//!
//! Every request is resolved to a tenant before it reaches a service, and
//! every tenant-owned record is filtered and stamped by the store.

mod app;
mod hooks;
pub mod records;
pub mod registry;
pub mod seed;
pub mod services;
pub mod validation;

pub use app::build;
