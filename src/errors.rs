use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Bad Request", "Unauthorized")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional detail (validation failures, offending field)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Invalid quantity for product {0}: must be between 1 and 100")]
    InvalidQuantity(String),

    #[error("Coupon is invalid or inactive")]
    CouponInvalid,

    #[error("Coupon has expired")]
    CouponExpired,

    #[error("Coupon usage limit reached")]
    CouponExhausted,

    #[error("Order total does not meet the coupon minimum of {required}")]
    CouponMinimumNotMet { required: i64 },

    #[error("Order total is below the minimum chargeable amount")]
    OrderTotalTooLow,

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Request origin not allowed: {0}")]
    OriginRejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Payment signature verification failed")]
    PaymentVerificationFailed,

    #[error("Payment gateway unavailable: {0}")]
    PaymentGatewayUnavailable(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_)
            | Self::ProductNotFound(_)
            | Self::InvalidQuantity(_)
            | Self::CouponInvalid
            | Self::CouponExpired
            | Self::CouponExhausted
            | Self::CouponMinimumNotMet { .. }
            | Self::OrderTotalTooLow
            | Self::PaymentVerificationFailed => StatusCode::BAD_REQUEST,
            Self::AuthenticationRequired | Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::OriginRejected(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::PaymentGatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::StoreError(_) | Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::StoreError(_) => "Internal server error".to_string(),
            Self::InternalServerError => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::ProductNotFound("p1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidQuantity("p1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::CouponMinimumNotMet { required: 2000 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::AuthenticationRequired.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::OriginRejected("https://evil.example".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::RateLimitExceeded.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ServiceError::PaymentVerificationFailed.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::PaymentGatewayUnavailable("missing credentials".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ServiceError::StoreError("backend down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_store_details() {
        assert_eq!(
            ServiceError::StoreError("connection string leaked".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::CouponMinimumNotMet { required: 2000 }.response_message(),
            "Order total does not meet the coupon minimum of 2000"
        );
    }

    #[tokio::test]
    async fn error_response_body_shape() {
        let response = ServiceError::CouponExpired.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.error, "Bad Request");
        assert_eq!(payload.message, "Coupon has expired");
    }
}
