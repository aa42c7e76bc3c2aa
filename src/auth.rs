//! Identity resolution for bearer credentials.
//!
//! The identity provider is consumed as a capability: given a bearer
//! token, resolve a user or reject. [`JwtIdentityResolver`] is the
//! HS256 implementation used in production wiring; tests substitute the
//! trait with whatever they need.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::ServiceError;
use crate::AppState;

/// Claim structure for identity tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub email: Option<String>, // User's email
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
    pub iss: String,           // Issuer
    pub aud: String,           // Audience
}

/// Authenticated user data extracted from the identity token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, bearer_token: &str) -> Result<AuthUser, ServiceError>;
}

pub struct JwtIdentityResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityResolver {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityResolver for JwtIdentityResolver {
    async fn resolve(&self, bearer_token: &str) -> Result<AuthUser, ServiceError> {
        let data = decode::<Claims>(bearer_token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!("token validation failed: {}", e);
                ServiceError::AuthError("invalid or expired token".to_string())
            })?;

        Ok(AuthUser {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ServiceError::AuthenticationRequired)?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or(ServiceError::AuthenticationRequired)?
            .trim();
        if token.is_empty() {
            return Err(ServiceError::AuthenticationRequired);
        }

        state.identity.resolve(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret-with-plenty-of-unique-characters-0123456789";

    fn token(sub: &str, exp_offset_secs: i64) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            email: Some(format!("{sub}@example.com")),
            iat: now,
            exp: now + exp_offset_secs,
            iss: "storefront-api".to_string(),
            aud: "storefront".to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn resolver() -> JwtIdentityResolver {
        JwtIdentityResolver::new(SECRET, "storefront-api", "storefront")
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let user = resolver().resolve(&token("user-42", 3600)).await.unwrap();
        assert_eq!(user.user_id, "user-42");
        assert_eq!(user.email.as_deref(), Some("user-42@example.com"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let err = resolver()
            .resolve(&token("user-42", -3600))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AuthError(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let err = resolver().resolve("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, ServiceError::AuthError(_)));
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let resolver = JwtIdentityResolver::new(SECRET, "storefront-api", "some-other-audience");
        let err = resolver.resolve(&token("user-42", 3600)).await.unwrap_err();
        assert!(matches!(err, ServiceError::AuthError(_)));
    }
}
