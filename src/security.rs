//! Request-origin checks for the price-sensitive checkout endpoints.
//!
//! Browsers attach an `Origin` header to cross-site POST requests, so a
//! mismatched origin is rejected before any business logic runs.
//! Requests without an `Origin` header (same-origin navigations,
//! non-browser clients) pass through; CSRF forgeries cannot suppress it.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use tracing::warn;

use crate::errors::ServiceError;
use crate::AppState;

#[derive(Clone, Debug)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    allow_any: bool,
}

impl OriginPolicy {
    pub fn new(allowed: Vec<String>, allow_any: bool) -> Self {
        Self { allowed, allow_any }
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(
            config.allowed_origins(),
            config.should_allow_permissive_cors(),
        )
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<(), ServiceError> {
        if self.allow_any {
            return Ok(());
        }

        let origin = match headers.get("origin").and_then(|v| v.to_str().ok()) {
            Some(origin) => origin,
            None => return Ok(()),
        };

        if self.allowed.iter().any(|allowed| allowed == origin) {
            Ok(())
        } else {
            warn!(%origin, "rejected request from disallowed origin");
            Err(ServiceError::OriginRejected(origin.to_string()))
        }
    }
}

/// Extractor that enforces the origin allow-list. Listed before the
/// authenticated-user extractor in checkout handlers so origin rejection
/// happens first, before credentials are even looked at.
pub struct VerifiedOrigin;

#[async_trait]
impl FromRequestParts<AppState> for VerifiedOrigin {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.origin_policy.check(&parts.headers)?;
        Ok(VerifiedOrigin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy() -> OriginPolicy {
        OriginPolicy::new(vec!["https://shop.example.com".to_string()], false)
    }

    fn headers_with_origin(origin: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("origin", HeaderValue::from_str(origin).unwrap());
        headers
    }

    #[test]
    fn allowed_origin_passes() {
        assert!(policy()
            .check(&headers_with_origin("https://shop.example.com"))
            .is_ok());
    }

    #[test]
    fn disallowed_origin_is_rejected() {
        let err = policy()
            .check(&headers_with_origin("https://evil.example"))
            .unwrap_err();
        assert!(matches!(err, ServiceError::OriginRejected(_)));
    }

    #[test]
    fn missing_origin_passes() {
        assert!(policy().check(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn allow_any_bypasses_the_list() {
        let policy = OriginPolicy::new(vec![], true);
        assert!(policy
            .check(&headers_with_origin("https://anything.example"))
            .is_ok());
    }
}
