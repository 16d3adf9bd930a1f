use std::collections::HashMap;

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    routing, Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tenancy_core::{Params, ServiceError, ServiceHandle, ServiceMethodKind, VerifiedClaims};

use crate::extract::{Claims, Scoped};
use crate::TenancyAxumError;

fn map_json_rejection(rejection: JsonRejection) -> TenancyAxumError {
    ServiceError::bad_request("Failed to parse the request body as JSON")
        .with_errors(json!({"_schema": [rejection.to_string()]}))
        .into()
}

fn rest_params(query: HashMap<String, String>, claims: VerifiedClaims) -> Params {
    Params::external("rest", query, claims)
}

fn allow<R>(svc: &ServiceHandle<R>, method: ServiceMethodKind) -> Result<(), TenancyAxumError>
where
    R: Send + Sync + 'static,
{
    if svc.capabilities().allows(method) {
        Ok(())
    } else {
        let allowed: Vec<&str> = svc
            .capabilities()
            .allowed_methods
            .iter()
            .map(ServiceMethodKind::as_str)
            .collect();
        Err(ServiceError::method_not_allowed(format!(
            "Method '{}' is not allowed on '{}'",
            method.as_str(),
            svc.name()
        ))
        .with_data(json!({ "allowed": allowed }))
        .into())
    }
}

/// `GET|POST /` and `GET|PUT|PATCH|DELETE /{id}` for one service.
///
/// Handlers pass the request's scope through untouched; isolation is the
/// store's job.
pub fn service_router<R>(svc: ServiceHandle<R>) -> Router<()>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/",
            routing::get(
                |State(svc): State<ServiceHandle<R>>,
                 Scoped(scope): Scoped,
                 Claims(claims): Claims,
                 Query(query): Query<HashMap<String, String>>| async move {
                    allow(&svc, ServiceMethodKind::Find)?;
                    let res = svc.find(&scope, rest_params(query, claims)).await?;
                    Ok::<_, TenancyAxumError>(Json(res))
                },
            )
            .post(
                |State(svc): State<ServiceHandle<R>>,
                 Scoped(scope): Scoped,
                 Claims(claims): Claims,
                 Query(query): Query<HashMap<String, String>>,
                 data: Result<Json<R>, JsonRejection>| async move {
                    allow(&svc, ServiceMethodKind::Create)?;
                    let Json(data) = data.map_err(map_json_rejection)?;
                    let res = svc.create(&scope, data, rest_params(query, claims)).await?;
                    Ok::<_, TenancyAxumError>(Json(res))
                },
            ),
        )
        .route(
            "/{id}",
            routing::get(
                |State(svc): State<ServiceHandle<R>>,
                 Scoped(scope): Scoped,
                 Claims(claims): Claims,
                 Query(query): Query<HashMap<String, String>>,
                 Path(id): Path<String>| async move {
                    allow(&svc, ServiceMethodKind::Get)?;
                    let res = svc.get(&scope, &id, rest_params(query, claims)).await?;
                    Ok::<_, TenancyAxumError>(Json(res))
                },
            )
            .put(
                |State(svc): State<ServiceHandle<R>>,
                 Scoped(scope): Scoped,
                 Claims(claims): Claims,
                 Query(query): Query<HashMap<String, String>>,
                 Path(id): Path<String>,
                 data: Result<Json<R>, JsonRejection>| async move {
                    allow(&svc, ServiceMethodKind::Update)?;
                    let Json(data) = data.map_err(map_json_rejection)?;
                    let res = svc.update(&scope, &id, data, rest_params(query, claims)).await?;
                    Ok::<_, TenancyAxumError>(Json(res))
                },
            )
            .patch(
                |State(svc): State<ServiceHandle<R>>,
                 Scoped(scope): Scoped,
                 Claims(claims): Claims,
                 Query(query): Query<HashMap<String, String>>,
                 Path(id): Path<String>,
                 data: Result<Json<Value>, JsonRejection>| async move {
                    allow(&svc, ServiceMethodKind::Patch)?;
                    let Json(patch) = data.map_err(map_json_rejection)?;
                    let res = svc.patch(&scope, &id, patch, rest_params(query, claims)).await?;
                    Ok::<_, TenancyAxumError>(Json(res))
                },
            )
            .delete(
                |State(svc): State<ServiceHandle<R>>,
                 Scoped(scope): Scoped,
                 Claims(claims): Claims,
                 Query(query): Query<HashMap<String, String>>,
                 Path(id): Path<String>| async move {
                    allow(&svc, ServiceMethodKind::Remove)?;
                    let res = svc.remove(&scope, &id, rest_params(query, claims)).await?;
                    Ok::<_, TenancyAxumError>(Json(res))
                },
            ),
        )
        .with_state(svc)
}
