//! tenancy-core: framework-agnostic tenant isolation.
//!
//! A request gets one [`RequestTenantContext`], filled at most once by the
//! [`TenantResolver`] from [`VerifiedClaims`]. Business code only ever hands
//! the resulting [`TenantScope`] to a [`TenantStore`], which filters reads and
//! stamps writes for every kind the [`EntityRegistry`] marks tenant-scoped.

pub mod app;
pub mod backend;
pub mod claims;
pub mod config;
pub mod context;
pub mod errors;
pub mod hooks;
pub mod params;
pub mod record;
pub mod registry;
pub mod resolve;
pub mod service;
pub mod store;
pub mod tenant;

pub use app::{App, ServiceHandle};
pub use backend::{MemoryBackend, Predicate, RecordBackend, RowFilter};
pub use claims::VerifiedClaims;
pub use config::{Config, ConfigSnapshot};
pub use context::{RequestTenantContext, TenantScope};
pub use errors::{ErrorKind, IsolationError, ServiceError, ServiceResult};
pub use hooks::{
    AfterHook, AppHook, BeforeHook, CallInfo, ErrorHook, HookContext, HookResult,
    RequireAuthenticated, ServiceHooks,
};
pub use params::Params;
pub use record::Record;
pub use registry::{EntityRegistry, EntityRegistryBuilder, Scope};
pub use resolve::{ResolverSettings, TenantResolver};
pub use service::{ServiceCapabilities, ServiceMethodKind, StoreService, TenantService};
pub use store::{IsolationSettings, Query, StampPolicy, TenantStore};
pub use tenant::{TenantId, TenantIdError};
