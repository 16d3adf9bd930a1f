// JWT verification and issuance.

use chrono::Utc;
use serde_json::{json, Map, Value};
use tenancy_core::VerifiedClaims;
use tracing::debug;
use uuid::Uuid;

use crate::core::AuthError;
use crate::options::JwtOptions;

pub trait JwtProvider: Send + Sync {
    fn sign(&self, jwt: &JwtOptions, claims: &Map<String, Value>) -> Result<String, AuthError>;

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Map<String, Value>, AuthError>;
}

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
struct NoJwtProvider;

#[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
impl JwtProvider for NoJwtProvider {
    fn sign(&self, _jwt: &JwtOptions, _claims: &Map<String, Value>) -> Result<String, AuthError> {
        Err(AuthError::Disabled)
    }

    fn verify(&self, _jwt: &JwtOptions, _token: &str) -> Result<Map<String, Value>, AuthError> {
        Err(AuthError::Disabled)
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
struct JsonwebtokenProvider;

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JsonwebtokenProvider {
    fn algorithm(alg: crate::options::JwtAlgorithm) -> jsonwebtoken::Algorithm {
        use crate::options::JwtAlgorithm;
        match alg {
            JwtAlgorithm::HS256 => jsonwebtoken::Algorithm::HS256,
            JwtAlgorithm::HS384 => jsonwebtoken::Algorithm::HS384,
            JwtAlgorithm::HS512 => jsonwebtoken::Algorithm::HS512,
        }
    }

    fn secret(jwt: &JwtOptions) -> Result<&[u8], AuthError> {
        jwt.secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::as_bytes)
            .ok_or(AuthError::MissingSecret)
    }
}

#[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
impl JwtProvider for JsonwebtokenProvider {
    fn sign(&self, jwt: &JwtOptions, claims: &Map<String, Value>) -> Result<String, AuthError> {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let header = Header::new(Self::algorithm(jwt.algorithm));
        encode(&header, claims, &EncodingKey::from_secret(Self::secret(jwt)?))
            .map_err(|e| AuthError::InvalidConfig(e.to_string()))
    }

    fn verify(&self, jwt: &JwtOptions, token: &str) -> Result<Map<String, Value>, AuthError> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let mut validation = Validation::new(Self::algorithm(jwt.algorithm));
        validation.set_issuer(&[jwt.issuer.as_str()]);
        validation.set_audience(&jwt.audience.iter().map(String::as_str).collect::<Vec<_>>());
        validation.leeway = jwt.leeway.as_secs();

        let decoded = decode::<Map<String, Value>>(
            token,
            &DecodingKey::from_secret(Self::secret(jwt)?),
            &validation,
        )
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(decoded.claims)
    }
}

/// Turns bearer tokens into [`VerifiedClaims`].
///
/// This is the identity-verification step that runs before tenant
/// resolution. It checks signature, issuer, audience and expiry and does
/// not look at the tenant claim at all.
pub struct JwtVerifier {
    options: JwtOptions,
    provider: Box<dyn JwtProvider>,
}

impl JwtVerifier {
    pub fn new(options: JwtOptions) -> Result<Self, AuthError> {
        options.validate()?;

        #[cfg(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto"))]
        let provider: Box<dyn JwtProvider> = Box::new(JsonwebtokenProvider);
        #[cfg(not(any(feature = "jwt-aws-lc-rs", feature = "jwt-rust-crypto")))]
        let provider: Box<dyn JwtProvider> = Box::new(NoJwtProvider);

        Ok(Self { options, provider })
    }

    pub fn options(&self) -> &JwtOptions {
        &self.options
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        let claims = self.provider.verify(&self.options, token)?;
        debug!(
            sub = claims.get("sub").and_then(serde_json::Value::as_str),
            "access token verified"
        );
        Ok(VerifiedClaims::from_verified(claims))
    }

    /// Issue an access token carrying `payload` plus `iss`, `aud`, `iat`,
    /// `exp` and `jti`. Standard fields win over the payload.
    pub fn create_access_token(&self, payload: Map<String, Value>) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let exp = now + self.options.access_token_expires_in.as_secs() as i64;

        let mut claims = payload;
        claims.insert("iss".to_string(), Value::String(self.options.issuer.clone()));
        claims.insert("aud".to_string(), json!(self.options.audience));
        claims.insert("iat".to_string(), Value::Number(now.into()));
        claims.insert("exp".to_string(), Value::Number(exp.into()));
        claims.insert("jti".to_string(), Value::String(Uuid::new_v4().to_string()));

        self.sign(&claims)
    }

    /// Sign `claims` exactly as given.
    pub fn sign(&self, claims: &Map<String, Value>) -> Result<String, AuthError> {
        self.provider.sign(&self.options, claims)
    }
}
