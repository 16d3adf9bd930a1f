//! tenancy-axum: axum adapter for tenancy-core.
//!
//! Builds routers from registered services and runs tenant resolution once
//! per request before any handler sees it.

pub mod app;
pub mod extract;
pub mod middleware;
pub mod rest;
mod error;

pub use error::TenancyAxumError;
pub use extract::{Claims, Scoped};
pub use middleware::ClaimsVerifier;

pub use app::{axum, AxumApp};
