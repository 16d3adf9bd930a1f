mod common;

use std::sync::Arc;

use ::axum::routing::get;
use ::axum::Router;
use common::{json_body, request, JsonClaims};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tenancy_axum::{axum, Scoped};
use tenancy_core::{
    App, EntityRegistry, IsolationSettings, Record, StoreService, TenantId, TenantStore,
};
use tower::ServiceExt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Memo {
    id: String,
    tenant_id: Option<TenantId>,
    text: String,
}

impl Record for Memo {
    const KIND: &'static str = "memos";

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
}

fn router() -> Router {
    let registry = Arc::new(EntityRegistry::builder().tenant_scoped::<Memo>().build().unwrap());
    let store = TenantStore::<Memo>::in_memory(registry, IsolationSettings::default());
    axum(App::new(), Arc::new(JsonClaims))
        .use_service::<Memo>("/memos", Arc::new(StoreService::new(store)))
        .unwrap()
        .router()
}

#[tokio::test]
async fn records_are_invisible_across_tenants() {
    let router = router();
    let a = TenantId::generate();
    let b = TenantId::generate();
    let as_a = json!({ "sub": "alice", "tenant_id": a.to_string() });
    let as_b = json!({ "sub": "bob", "tenant_id": b.to_string() });

    let res = router
        .clone()
        .oneshot(request("POST", "/memos", Some(as_a.clone()), Some(json!({"text": "hi"}))))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let created = json_body(res).await;
    assert_eq!(created["tenant_id"], json!(a.to_string()));
    let id = created["id"].as_str().unwrap().to_string();

    let res = router
        .clone()
        .oneshot(request("GET", "/memos", Some(as_b.clone()), None))
        .await
        .unwrap();
    assert_eq!(json_body(res).await, json!([]));

    let res = router
        .clone()
        .oneshot(request("GET", &format!("/memos/{id}"), Some(as_b), None))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let res = router
        .oneshot(request("GET", &format!("/memos/{id}"), Some(as_a), None))
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn malformed_tenant_claim_is_401() {
    for bad in [json!(""), json!(7), json!("not-a-uuid")] {
        let res = router()
            .oneshot(request("GET", "/memos", Some(json!({ "sub": "x", "tenant_id": bad })), None))
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 401);
        let body = json_body(res).await;
        assert_eq!(body["name"], "NotAuthenticated");
    }
}

#[tokio::test]
async fn unusable_credentials_are_401() {
    let res = router()
        .oneshot(
            ::axum::http::Request::builder()
                .uri("/memos")
                .header("authorization", "Bearer {not json")
                .body(::axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn write_without_any_tenant_is_a_server_error() {
    let res = router()
        .oneshot(request(
            "POST",
            "/memos",
            Some(json!({ "sub": "root", "role": "superadmin" })),
            Some(json!({"text": "orphan"})),
        ))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["name"], "GeneralError");
    assert!(body["message"].as_str().unwrap().contains("no tenant"));
}

#[tokio::test]
async fn platform_callers_read_across_tenants() {
    let router = router();
    for tenant in [TenantId::generate(), TenantId::generate()] {
        let res = router
            .clone()
            .oneshot(request(
                "POST",
                "/memos",
                Some(json!({ "tenant_id": tenant.to_string() })),
                Some(json!({"text": "x"})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
    }

    let res = router
        .oneshot(request("GET", "/memos", Some(json!({ "role": "superadmin" })), None))
        .await
        .unwrap();
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn scope_extractor_without_middleware_fails_closed() {
    let bare = Router::new().route(
        "/",
        get(|Scoped(scope): Scoped| async move { format!("{:?}", scope.tenant_id()) }),
    );

    let res = bare.oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(res.status().as_u16(), 500);
}
