use std::sync::Arc;

use anyhow::Result;
use tenancy_auth::{JwtOptions, JwtVerifier};
use tenancy_axum::{axum, AxumApp};
use tenancy_core::{
    App, Config, IsolationSettings, ResolverSettings, StampPolicy, TenantResolver,
};
use tracing::info;

/// Wire the HR app from `config`.
///
/// Unless configured otherwise, a tenant user may not create records owned
/// by another tenant (`isolation.stamp_policy = reject_mismatch`).
///
/// Fails on startup when the JWT secret is missing or an isolation setting
/// is invalid; nothing is served with a half-built configuration.
pub fn build(mut config: Config) -> Result<AxumApp> {
    if !config.has("isolation.stamp_policy") {
        config.set("isolation.stamp_policy", StampPolicy::RejectMismatch.to_string());
    }
    let app = App::with_config(config);
    let snapshot = app.config_snapshot();

    let registry = Arc::new(crate::registry::entity_registry()?);
    let isolation = IsolationSettings::from_config(&snapshot)?;
    let resolver = TenantResolver::new(ResolverSettings::from_config(&snapshot));
    let verifier = JwtVerifier::new(JwtOptions::from_config(&snapshot)?)?;

    crate::hooks::global_hooks(&app, resolver.clone());

    let ax = axum(app, Arc::new(verifier));
    let ax = crate::services::configure(ax, registry, isolation, resolver)?;

    info!(
        services = ?ax.app.service_names(),
        stamp_policy = %isolation.stamp_policy,
        "hr app ready"
    );
    Ok(ax)
}
