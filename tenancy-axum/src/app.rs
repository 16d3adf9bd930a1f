use std::sync::Arc;

use axum::http::Uri;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tenancy_core::{App, ResolverSettings, ServiceError, TenantResolver, TenantService};
use tokio::net::{TcpListener, ToSocketAddrs};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::middleware::{resolve_tenant, ClaimsVerifier, TenantLayer};
use crate::rest;
use crate::TenancyAxumError;

/// An [`App`] plus the axum routes that expose it.
///
/// Every service route runs behind the tenant middleware; `/health` does
/// not.
#[derive(Clone)]
pub struct AxumApp {
    pub app: App,
    routes: Router<()>,
    has_routes: bool,
    tenant: TenantLayer,
}

impl AxumApp {
    /// Resolver settings are read from the app config (`auth.*` keys).
    pub fn new(app: App, verifier: Arc<dyn ClaimsVerifier>) -> Self {
        let resolver = TenantResolver::new(ResolverSettings::from_config(&app.config_snapshot()));
        Self {
            app,
            routes: Router::new(),
            has_routes: false,
            tenant: TenantLayer::new(verifier, resolver),
        }
    }

    pub fn use_router(mut self, path: &str, router: Router<()>) -> Self {
        self.routes = self.routes.nest(path, router);
        self.has_routes = true;
        self
    }

    /// Register `service` under `path` and mount its REST routes there.
    pub fn use_service<R>(
        self,
        path: &str,
        service: Arc<dyn TenantService<R>>,
    ) -> anyhow::Result<Self>
    where
        R: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let name = path.trim_start_matches('/');
        self.app.register(name, service)?;
        let handle = self.app.service::<R>(name)?;

        Ok(self.use_router(path, rest::service_router(handle)))
    }

    /// The finished router with tenant resolution, tracing and request ids.
    pub fn router(&self) -> Router {
        let layers = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id());

        let mut routes = self.routes.clone();
        if self.has_routes {
            routes = routes.route_layer(middleware::from_fn_with_state(
                self.tenant.clone(),
                resolve_tenant,
            ));
        }

        routes
            .route("/health", get(health))
            .fallback(not_found)
            .layer(layers)
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn not_found(uri: Uri) -> TenancyAxumError {
    ServiceError::not_found(format!("Page not found: {}", uri.path())).into()
}

pub fn axum(app: App, verifier: Arc<dyn ClaimsVerifier>) -> AxumApp {
    AxumApp::new(app, verifier)
}
