// JWT options.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tenancy_core::ConfigSnapshot;

use crate::core::AuthError;

/// HMAC signing algorithms.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

impl std::str::FromStr for JwtAlgorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::HS256),
            "HS384" => Ok(Self::HS384),
            "HS512" => Ok(Self::HS512),
            other => Err(AuthError::InvalidConfig(format!(
                "unsupported JWT algorithm '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct JwtOptions {
    pub algorithm: JwtAlgorithm,
    /// Token issuer (iss claim)
    pub issuer: String,
    /// Accepted audiences (aud claim)
    pub audience: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub access_token_expires_in: Duration,
    /// Clock skew tolerated when checking `exp`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
    pub secret: Option<String>,
}

impl Default for JwtOptions {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::default(),
            issuer: "tenancy-auth".to_string(),
            audience: vec!["tenancy-api".to_string()],
            access_token_expires_in: Duration::from_secs(3600), // 1 hour
            leeway: Duration::from_secs(60),
            secret: None,
        }
    }
}

impl JwtOptions {
    /// Reads the `auth.jwt.*` keys over the defaults.
    ///
    /// ```
    /// use tenancy_core::Config;
    /// use tenancy_auth::JwtOptions;
    ///
    /// let mut config = Config::new();
    /// config.set("auth.jwt.secret", "s3cret");
    /// config.set("auth.jwt.expires_in", "15m");
    ///
    /// let options = JwtOptions::from_config(&config.snapshot()).unwrap();
    /// assert_eq!(options.access_token_expires_in.as_secs(), 900);
    /// ```
    pub fn from_config(config: &ConfigSnapshot) -> Result<Self, AuthError> {
        let mut options = Self::default();

        if let Some(alg) = config.get("auth.jwt.algorithm") {
            options.algorithm = alg.parse()?;
        }
        if let Some(issuer) = config.get_string("auth.jwt.issuer") {
            options.issuer = issuer;
        }
        if let Some(audience) = config.get_list("auth.jwt.audience") {
            options.audience = audience;
        }
        if let Some(raw) = config.get("auth.jwt.expires_in") {
            options.access_token_expires_in = parse_duration("auth.jwt.expires_in", raw)?;
        }
        if let Some(raw) = config.get("auth.jwt.leeway") {
            options.leeway = parse_duration("auth.jwt.leeway", raw)?;
        }
        options.secret = config.get_string("auth.jwt.secret");

        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.issuer.is_empty() {
            return Err(AuthError::InvalidConfig("JWT issuer cannot be empty".into()));
        }
        if self.audience.is_empty() {
            return Err(AuthError::InvalidConfig("JWT audience cannot be empty".into()));
        }
        match self.secret.as_deref() {
            None | Some("") => return Err(AuthError::MissingSecret),
            Some(_) => {}
        }
        if self.access_token_expires_in.is_zero() {
            return Err(AuthError::InvalidConfig(
                "Access token expiration must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, AuthError> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| AuthError::InvalidConfig(format!("{key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenancy_core::Config;

    #[test]
    fn from_config_requires_a_secret() {
        let err = JwtOptions::from_config(&Config::new().snapshot()).unwrap_err();
        assert!(matches!(err, AuthError::MissingSecret));
    }

    #[test]
    fn from_config_reads_overrides() {
        let mut config = Config::new();
        config.set("auth.jwt.secret", "s3cret");
        config.set("auth.jwt.issuer", "hr-idp");
        config.set("auth.jwt.audience", "hr-api, hr-admin");
        config.set("auth.jwt.algorithm", "hs512");
        config.set("auth.jwt.leeway", "5s");

        let options = JwtOptions::from_config(&config.snapshot()).unwrap();
        assert_eq!(options.issuer, "hr-idp");
        assert_eq!(options.audience, vec!["hr-api", "hr-admin"]);
        assert_eq!(options.algorithm, JwtAlgorithm::HS512);
        assert_eq!(options.leeway, Duration::from_secs(5));
        assert_eq!(options.access_token_expires_in, Duration::from_secs(3600));
    }

    #[test]
    fn bad_durations_and_algorithms_are_config_errors() {
        let mut config = Config::new();
        config.set("auth.jwt.secret", "s3cret");
        config.set("auth.jwt.expires_in", "soon");
        assert!(matches!(
            JwtOptions::from_config(&config.snapshot()),
            Err(AuthError::InvalidConfig(_))
        ));

        assert!("RS256".parse::<JwtAlgorithm>().is_err());
    }
}
