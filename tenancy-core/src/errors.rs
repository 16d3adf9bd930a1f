//! # Errors
//!
//! Two layers:
//! - [`IsolationError`]: faults of the isolation core itself. These mean the
//!   system is misconfigured or the request pipeline is broken, never that
//!   the client asked for something it may not see.
//! - [`ServiceError`]: the structured, Feathers-style error that crosses the
//!   service pipeline inside `anyhow::Error` and is rendered by transports.
//!
//! Every isolation error normalizes to a 500 `GeneralError`, except a
//! malformed tenant claim which is the caller's credential problem (401).
//! Cross-tenant reads are not errors at this level; they surface as an empty
//! result, which services turn into `NotFound`.

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

use crate::tenant::TenantId;

/// A convenience result type for pipeline APIs.
pub type ServiceResult<T> = std::result::Result<T, AnyError>;

/// Failures raised by the isolation core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IsolationError {
    /// Second `set` on one request context. A pipeline-ordering bug.
    #[error("request tenant context already set to {existing} (attempted {attempted})")]
    ContextAlreadySet {
        existing: TenantId,
        attempted: TenantId,
    },

    /// Insert of a tenant-scoped record with no tenant on the record or in scope.
    #[error("cannot persist `{kind}` record: no tenant in context and none on the record")]
    MissingTenantContext { kind: &'static str },

    /// The verified tenant claim is present but unusable.
    #[error("malformed `{claim}` claim: {reason}")]
    MalformedTenantClaim { claim: String, reason: String },

    /// Caller-supplied owner disagrees with the active scope.
    #[error("`{kind}` record carries tenant {record} but the active tenant is {context}")]
    TenantMismatch {
        kind: &'static str,
        record: TenantId,
        context: TenantId,
    },

    /// Record kind missing from the entity registry; the store refuses to guess.
    #[error("record kind `{kind}` is not classified in the entity registry")]
    UnclassifiedRecord { kind: &'static str },

    /// Kind is registered as tenant-scoped but its type cannot hold a tenant id.
    #[error("record kind `{kind}` is tenant-scoped but does not accept a tenant id")]
    StampingUnsupported { kind: &'static str },
}

impl IsolationError {
    /// Status class used when this error reaches a transport.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IsolationError::MalformedTenantClaim { .. } => ErrorKind::NotAuthenticated,
            _ => ErrorKind::GeneralError,
        }
    }
}

/// Error classes with their HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,       // 400
    NotAuthenticated, // 401
    Forbidden,        // 403
    NotFound,         // 404
    MethodNotAllowed, // 405
    Conflict,         // 409
    Unprocessable,    // 422
    GeneralError,     // 500
    NotImplemented,   // 501
    Unavailable,      // 503
}

impl ErrorKind {
    fn describe(&self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "BadRequest", "bad-request"),
            ErrorKind::NotAuthenticated => (401, "NotAuthenticated", "not-authenticated"),
            ErrorKind::Forbidden => (403, "Forbidden", "forbidden"),
            ErrorKind::NotFound => (404, "NotFound", "not-found"),
            ErrorKind::MethodNotAllowed => (405, "MethodNotAllowed", "method-not-allowed"),
            ErrorKind::Conflict => (409, "Conflict", "conflict"),
            ErrorKind::Unprocessable => (422, "Unprocessable", "unprocessable"),
            ErrorKind::GeneralError => (500, "GeneralError", "general-error"),
            ErrorKind::NotImplemented => (501, "NotImplemented", "not-implemented"),
            ErrorKind::Unavailable => (503, "Unavailable", "unavailable"),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.describe().0
    }

    /// Error `name` (e.g. "NotFound").
    pub fn name(&self) -> &'static str {
        self.describe().1
    }

    /// Kebab-cased `className`.
    pub fn class_name(&self) -> &'static str {
        self.describe().2
    }
}

/// A structured error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct ServiceError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub errors: Option<Value>,
    pub source: Option<AnyError>,
}

impl ServiceError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            errors: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Wrap into `anyhow::Error` so it flows through the hook pipeline.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `ServiceError` anywhere in an error chain.
    pub fn find(err: &AnyError) -> Option<&ServiceError> {
        err.chain().find_map(|e| e.downcast_ref::<ServiceError>())
    }

    /// Turn any pipeline error into a `ServiceError`:
    /// - a `ServiceError` is kept as is
    /// - an `IsolationError` keeps its message and maps to its status class
    /// - anything else becomes a `GeneralError`
    pub fn normalize(err: AnyError) -> ServiceError {
        let err = match err.downcast::<ServiceError>() {
            Ok(svc) => return svc,
            Err(other) => other,
        };

        if let Some(iso) = err.chain().find_map(|e| e.downcast_ref::<IsolationError>()) {
            let kind = iso.kind();
            let message = iso.to_string();
            return ServiceError::new(kind, message).with_source(err);
        }

        ServiceError::new(ErrorKind::GeneralError, err.to_string()).with_source(err)
    }

    /// Copy suitable for clients: the `source` chain is dropped.
    pub fn sanitize_for_client(&self) -> ServiceError {
        ServiceError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            errors: self.errors.clone(),
            source: None,
        }
    }

    /// Feathers-style JSON payload.
    pub fn to_json(&self) -> Value {
        let mut base = serde_json::json!({
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        if let Some(e) = &self.errors {
            base["errors"] = e.clone();
        }
        base
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn not_authenticated(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAuthenticated, msg)
    }
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn method_not_allowed(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unprocessable, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, msg)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Return early with a `ServiceError`.
#[macro_export]
macro_rules! bail_service {
    ($ctor:ident, $msg:expr) => {
        return Err($crate::errors::ServiceError::$ctor($msg).into_anyhow())
    };
    ($ctor:ident, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::errors::ServiceError::$ctor(format!($fmt, $($arg)*)).into_anyhow())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_errors_normalize_to_server_errors() {
        let err = AnyError::new(IsolationError::MissingTenantContext { kind: "employees" });
        let svc = ServiceError::normalize(err);
        assert_eq!(svc.code(), 500);
        assert_eq!(svc.name(), "GeneralError");
        assert!(svc.message.contains("employees"));
    }

    #[test]
    fn malformed_claim_normalizes_to_401() {
        let err = AnyError::new(IsolationError::MalformedTenantClaim {
            claim: "tenant_id".into(),
            reason: "not a uuid".into(),
        });
        assert_eq!(ServiceError::normalize(err).code(), 401);
    }

    #[test]
    fn context_wrapped_isolation_error_is_still_recognized() {
        let err = AnyError::new(IsolationError::UnclassifiedRecord { kind: "widgets" })
            .context("creating widget");
        assert_eq!(ServiceError::normalize(err).kind, ErrorKind::GeneralError);
    }

    #[test]
    fn service_errors_pass_through_and_sanitize() {
        let err = ServiceError::not_found("No record found for id 'e1'")
            .with_source(anyhow::anyhow!("secret detail"))
            .into_anyhow();
        let svc = ServiceError::normalize(err);
        assert_eq!(svc.code(), 404);

        let safe = svc.sanitize_for_client();
        assert!(safe.source.is_none());
        assert_eq!(safe.to_json()["className"], "not-found");
    }

    #[test]
    fn bail_macro_returns_structured_error() {
        fn fails() -> ServiceResult<()> {
            bail_service!(conflict, "duplicate id '{}'", "e1");
        }
        let err = fails().unwrap_err();
        let svc = ServiceError::find(&err).unwrap();
        assert_eq!(svc.code(), 409);
        assert_eq!(svc.message, "duplicate id 'e1'");
    }
}
