//! tenancy-auth: identity verification that feeds tenant resolution.
//!
//! A [`JwtVerifier`] checks bearer tokens and yields
//! [`tenancy_core::VerifiedClaims`]; nothing here interprets the tenant claim.

pub mod core;
pub mod jwt;
pub mod options;

pub use crate::core::{extract_bearer_token, AuthError};
pub use jwt::{JwtProvider, JwtVerifier};
pub use options::{JwtAlgorithm, JwtOptions};
