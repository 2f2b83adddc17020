//! Bearer-token authentication and the per-request capability check.

use crate::models::{Access, AccessTokenClaims, Permissions, Resource, Role, User};
use crate::startup::AppState;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use service_core::error::AppError;

/// HS256 signing and verification keys derived from a shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an access token valid for `ttl`.
    pub fn issue(&self, user_id: &str, email: &str, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Validate signature and expiry.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

/// The authenticated caller. Extracting it validates the bearer token and
/// loads the user's current role and grants once; handlers then ask it for
/// capabilities.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: Permissions,
}

impl Principal {
    /// Caller used when token checking is disabled.
    pub fn trusted() -> Self {
        Self {
            id: "system".to_string(),
            email: "system@localhost".to_string(),
            full_name: "System".to_string(),
            role: Role::Admin,
            permissions: Permissions::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.id
    }

    pub fn access(&self, resource: &Resource) -> Access {
        self.permissions.access(self.role, resource)
    }

    pub fn can_read(&self, resource: &Resource) -> bool {
        self.access(resource).can_read
    }

    pub fn can_write(&self, resource: &Resource) -> bool {
        self.access(resource).can_write
    }

    pub fn require_read(&self, resource: &Resource) -> Result<(), AppError> {
        if self.can_read(resource) {
            return Ok(());
        }
        tracing::warn!(user_id = %self.id, resource = %resource, "Read denied");
        Err(AppError::Forbidden(anyhow::anyhow!(
            "No read access to {}",
            resource
        )))
    }

    pub fn require_write(&self, resource: &Resource) -> Result<(), AppError> {
        if self.can_write(resource) {
            return Ok(());
        }
        tracing::warn!(user_id = %self.id, resource = %resource, "Write denied");
        Err(AppError::Forbidden(anyhow::anyhow!(
            "No write access to {}",
            resource
        )))
    }
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            permissions: user.permissions,
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(keys) = &state.jwt else {
            return Ok(Principal::trusted());
        };

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
            })?;

        let claims = keys.verify(token)?;
        let user = state
            .users
            .get(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User not found")))?;
        Ok(Principal::from(user))
    }
}
