//! Verified identity claims.

use serde_json::{Map, Value};

/// Claims of the current caller, as produced by an identity verifier.
///
/// The resolution step only accepts this type, so it can only run after
/// verification did. Requests without credentials carry
/// [`VerifiedClaims::anonymous`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifiedClaims {
    claims: Map<String, Value>,
    authenticated: bool,
}

impl VerifiedClaims {
    /// Claims of an unauthenticated caller (public endpoints).
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Claims whose signature and validity were checked by the caller.
    ///
    /// Only identity verifiers should call this.
    pub fn from_verified(claims: Map<String, Value>) -> Self {
        Self {
            claims,
            authenticated: true,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Roles under `claim`, accepting a single string or an array of strings.
    pub fn roles(&self, claim: &str) -> Vec<String> {
        match self.get(claim) {
            Some(Value::String(role)) => vec![role.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(v: Value) -> VerifiedClaims {
        VerifiedClaims::from_verified(v.as_object().cloned().unwrap())
    }

    #[test]
    fn roles_accept_string_or_array() {
        assert_eq!(claims(json!({"role": "hr_manager"})).roles("role"), vec!["hr_manager"]);
        assert_eq!(
            claims(json!({"roles": ["employee", 3, "auditor"]})).roles("roles"),
            vec!["employee", "auditor"]
        );
        assert!(claims(json!({})).roles("role").is_empty());
    }

    #[test]
    fn anonymous_is_not_authenticated() {
        let anon = VerifiedClaims::anonymous();
        assert!(!anon.is_authenticated());
        assert_eq!(anon.subject(), None);
        assert!(claims(json!({"sub": "u1"})).is_authenticated());
    }
}
