//! Tenant identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, globally-unique identifier of one tenant.
///
/// Backed by a 128-bit UUID. The nil UUID is rejected by every constructor
/// that parses untrusted input, so a `TenantId` in hand always names a real
/// tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

impl TenantId {
    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random tenant id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse untrusted text (claims, headers, config).
    pub fn parse(raw: &str) -> Result<Self, TenantIdError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TenantIdError::Empty);
        }

        let id = Uuid::parse_str(raw).map_err(|e| TenantIdError::Invalid(e.to_string()))?;
        if id.is_nil() {
            return Err(TenantIdError::Nil);
        }

        Ok(Self(id))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TenantId {
    type Err = TenantIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Uuid> for TenantId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Why a raw value could not become a [`TenantId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TenantIdError {
    #[error("tenant id is empty")]
    Empty,

    #[error("tenant id is the nil uuid")]
    Nil,

    #[error("tenant id is not a uuid: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hyphenated_uuid() {
        let id = TenantId::parse("11111111-1111-1111-1111-111111111111").unwrap();
        assert_eq!(id.to_string(), "11111111-1111-1111-1111-111111111111");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id: TenantId = " 22222222-2222-2222-2222-222222222222 ".parse().unwrap();
        assert_eq!(id.to_string(), "22222222-2222-2222-2222-222222222222");
    }

    #[test]
    fn rejects_empty_nil_and_garbage() {
        assert_eq!(TenantId::parse("  "), Err(TenantIdError::Empty));
        assert_eq!(
            TenantId::parse("00000000-0000-0000-0000-000000000000"),
            Err(TenantIdError::Nil)
        );
        assert!(matches!(TenantId::parse("acme"), Err(TenantIdError::Invalid(_))));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = TenantId::parse("11111111-1111-1111-1111-111111111111").unwrap();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!("11111111-1111-1111-1111-111111111111"));

        let back: TenantId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
