use std::collections::HashMap;

use crate::claims::VerifiedClaims;

/// Per-call parameters handed to hooks and services.
///
/// `provider` is `None` for internal calls (jobs, seeding) and names the
/// transport otherwise (e.g. `"rest"`).
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub provider: Option<String>,
    pub query: HashMap<String, String>,
    pub claims: VerifiedClaims,
}

impl Params {
    pub fn internal() -> Self {
        Self::default()
    }

    pub fn external(
        provider: impl Into<String>,
        query: HashMap<String, String>,
        claims: VerifiedClaims,
    ) -> Self {
        Self {
            provider: Some(provider.into()),
            query,
            claims,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.provider.is_none()
    }

    /// `$limit` query parameter.
    pub fn limit(&self) -> Option<usize> {
        self.query.get("$limit").and_then(|v| v.parse().ok())
    }

    /// `$skip` query parameter, 0 when absent.
    pub fn skip(&self) -> usize {
        self.query
            .get("$skip")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}
