//! Tenant resolution step.
//!
//! Runs once per request, after identity verification and before any data
//! access: it reads the tenant claim from [`VerifiedClaims`] and populates
//! the request's [`RequestTenantContext`].

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::claims::VerifiedClaims;
use crate::config::ConfigSnapshot;
use crate::context::{RequestTenantContext, TenantScope};
use crate::errors::IsolationError;
use crate::tenant::TenantId;

pub const DEFAULT_TENANT_CLAIM: &str = "tenant_id";
pub const DEFAULT_ROLE_CLAIM: &str = "role";
pub const DEFAULT_ADMIN_ROLES: &[&str] = &["superadmin", "platform_admin"];

/// Where to find tenant and role information among the claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub tenant_claim: String,
    pub role_claim: String,
    /// Roles allowed to act without a tenant claim.
    pub admin_roles: Vec<String>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            tenant_claim: DEFAULT_TENANT_CLAIM.to_string(),
            role_claim: DEFAULT_ROLE_CLAIM.to_string(),
            admin_roles: DEFAULT_ADMIN_ROLES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl ResolverSettings {
    /// Read `auth.tenant_claim`, `auth.role_claim` and `auth.admin_roles`
    /// (comma separated), falling back to defaults.
    pub fn from_config(config: &ConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            tenant_claim: config
                .get_string("auth.tenant_claim")
                .unwrap_or(defaults.tenant_claim),
            role_claim: config
                .get_string("auth.role_claim")
                .unwrap_or(defaults.role_claim),
            admin_roles: config
                .get_list("auth.admin_roles")
                .unwrap_or(defaults.admin_roles),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TenantResolver {
    settings: ResolverSettings,
}

impl TenantResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Populate `ctx` from the verified claims.
    ///
    /// Returns the tenant that was set, or `None` when the claim is absent.
    /// A second resolution into the same context is a pipeline bug and
    /// surfaces as [`IsolationError::ContextAlreadySet`].
    pub fn resolve_into(
        &self,
        claims: &VerifiedClaims,
        ctx: &RequestTenantContext,
    ) -> Result<Option<TenantId>, IsolationError> {
        match self.tenant_claim(claims)? {
            Some(tenant_id) => {
                ctx.set(tenant_id)?;
                debug!(tenant_id = %tenant_id, "resolved request tenant");
                Ok(Some(tenant_id))
            }
            None => {
                if claims.is_authenticated() && !self.is_admin(claims) {
                    warn!(
                        subject = claims.subject().unwrap_or("<unknown>"),
                        claim = %self.settings.tenant_claim,
                        "authenticated non-administrator request carries no tenant claim"
                    );
                }
                Ok(None)
            }
        }
    }

    /// Resolve into a fresh context and hand back its scope.
    pub fn resolve(&self, claims: &VerifiedClaims) -> Result<TenantScope, IsolationError> {
        let ctx = Arc::new(RequestTenantContext::new());
        self.resolve_into(claims, &ctx)?;
        Ok(TenantScope::from_context(ctx))
    }

    pub fn is_admin(&self, claims: &VerifiedClaims) -> bool {
        claims
            .roles(&self.settings.role_claim)
            .iter()
            .any(|role| self.settings.admin_roles.iter().any(|a| a == role))
    }

    fn tenant_claim(&self, claims: &VerifiedClaims) -> Result<Option<TenantId>, IsolationError> {
        let claim = &self.settings.tenant_claim;
        let malformed = |reason: String| IsolationError::MalformedTenantClaim {
            claim: claim.clone(),
            reason,
        };

        match claims.get(claim) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(raw)) => TenantId::parse(raw)
                .map(Some)
                .map_err(|e| malformed(e.to_string())),
            Some(other) => Err(malformed(format!("expected a string, got {other}"))),
        }
    }
}
