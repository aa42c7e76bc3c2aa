//! Checkout endpoints: payment-order creation, payment settlement, and
//! cash-on-delivery validation.
//!
//! All three run the same security preconditions before any pricing
//! work: origin allow-list, bearer identity, and (for the two
//! order-initiating endpoints) a per-user rate limit.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::validate_input;
use crate::models::{Address, LineItemRequest, ResolvedLineItem};
use crate::security::VerifiedOrigin;
use crate::services::settlement::{PaymentCallback, SettlementOutcome};
use crate::AppState;

/// Creates the router for checkout endpoints
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/online/create-order", post(create_payment_order))
        .route("/online/verify-payment", post(verify_payment))
        .route("/cod/validate", post(validate_cod))
}

fn checkout_rate_key(user_id: &str) -> String {
    format!("checkout:{user_id}")
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 50))]
    pub cart_items: Vec<LineItemRequest>,
    /// Optional receipt identifier forwarded to the gateway.
    #[validate(length(max = 40))]
    pub receipt: Option<String>,
    /// Accepted for client compatibility; gateway audit metadata is
    /// always server-derived and this field is not forwarded.
    #[schema(value_type = Object)]
    pub notes: Option<serde_json::Value>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    /// Gateway order id to hand to the client-side payment flow.
    pub order_id: String,
    /// Amount in minor units, as registered with the gateway.
    pub amount: i64,
    pub currency: String,
    pub verified_total: i64,
    pub discount: i64,
    pub final_total: i64,
    pub verification_details: Vec<ResolvedLineItem>,
}

/// Create a gateway payment order for the server-verified cart total.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/online/create-order",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Payment order created", body = CreateOrderResponse),
        (status = 400, description = "Validation or pricing failure", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = crate::errors::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment gateway unavailable", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_payment_order(
    State(state): State<AppState>,
    _origin: VerifiedOrigin,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    state
        .checkout_limiter
        .check(&checkout_rate_key(&user.user_id))?;

    let initiation = state
        .services
        .checkout
        .initiate_payment(
            &user.user_id,
            &payload.cart_items,
            payload.coupon_code.as_deref(),
            payload.receipt,
        )
        .await?;

    let pricing = initiation.pricing;
    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: initiation.gateway_order_id,
            amount: initiation.amount_minor,
            currency: initiation.currency,
            verified_total: pricing.verified_subtotal,
            discount: pricing.discount,
            final_total: pricing.final_total,
            verification_details: pricing.resolved_items,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    #[validate(length(min = 1))]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    #[validate(length(min = 1))]
    pub gateway_payment_id: String,
    #[serde(alias = "razorpay_signature")]
    #[validate(length(min = 1))]
    pub signature: String,
    pub address: Option<Address>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    pub already_processed: bool,
    pub payment_id: String,
    pub order_id: Uuid,
}

/// Verify a gateway payment callback and commit the order exactly once.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/online/verify-payment",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 201, description = "Payment verified and order created", body = VerifyPaymentResponse),
        (status = 200, description = "Payment was already processed", body = VerifyPaymentResponse),
        (status = 400, description = "Signature verification failed", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    _origin: VerifiedOrigin,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let callback = PaymentCallback {
        gateway_order_id: payload.gateway_order_id,
        gateway_payment_id: payload.gateway_payment_id.clone(),
        signature: payload.signature,
    };

    let outcome = state
        .services
        .settlement
        .settle(&user.user_id, &callback, payload.address)
        .await?;

    let response = match outcome {
        SettlementOutcome::Committed(order) => (
            StatusCode::CREATED,
            Json(VerifyPaymentResponse {
                already_processed: false,
                payment_id: payload.gateway_payment_id,
                order_id: order.id,
            }),
        ),
        SettlementOutcome::AlreadyProcessed { order_id } => (
            StatusCode::OK,
            Json(VerifyPaymentResponse {
                already_processed: true,
                payment_id: payload.gateway_payment_id,
                order_id,
            }),
        ),
    };
    Ok(response)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CodValidateRequest {
    #[validate(length(min = 1, max = 50))]
    pub cart_items: Vec<LineItemRequest>,
    pub coupon_code: Option<String>,
    pub address: Option<Address>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CodValidateResponse {
    pub order_id: Uuid,
    pub verified_total: i64,
    pub discount: i64,
    pub final_total: i64,
}

/// Validate a cash-on-delivery cart and place the order.
#[utoipa::path(
    post,
    path = "/api/v1/checkout/cod/validate",
    request_body = CodValidateRequest,
    responses(
        (status = 201, description = "Order placed", body = CodValidateResponse),
        (status = 400, description = "Validation or pricing failure", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid credentials", body = crate::errors::ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn validate_cod(
    State(state): State<AppState>,
    _origin: VerifiedOrigin,
    user: AuthUser,
    Json(payload): Json<CodValidateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    state
        .checkout_limiter
        .check(&checkout_rate_key(&user.user_id))?;

    let order = state
        .services
        .checkout
        .validate_cod(
            &user.user_id,
            &payload.cart_items,
            payload.coupon_code.as_deref(),
            payload.address,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CodValidateResponse {
            order_id: order.id,
            verified_total: order.subtotal,
            discount: order.discount,
            final_total: order.total,
        }),
    ))
}
