#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Request};
use http_body_util::BodyExt;
use serde_json::{Map, Value};
use tenancy_axum::ClaimsVerifier;
use tenancy_core::{ServiceError, VerifiedClaims};

/// `Authorization: Bearer <json object>` is taken as already-verified claims.
pub struct JsonClaims;

impl ClaimsVerifier for JsonClaims {
    fn verify(&self, headers: &HeaderMap) -> Result<VerifiedClaims, ServiceError> {
        let Some(raw) = headers.get("authorization") else {
            return Ok(VerifiedClaims::anonymous());
        };
        let token = raw
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ServiceError::not_authenticated("bad authorization header"))?;
        serde_json::from_str::<Map<String, Value>>(token)
            .map(VerifiedClaims::from_verified)
            .map_err(|e| ServiceError::not_authenticated(e.to_string()))
    }
}

pub fn request(method: &str, uri: &str, claims: Option<Value>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(claims) = claims {
        builder = builder.header("authorization", format!("Bearer {claims}"));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
