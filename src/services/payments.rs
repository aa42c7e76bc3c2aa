//! Payment gateway client and callback signature verification.
//!
//! The gateway is consumed as a capability: create an order for an
//! amount, verify a callback signature. [`RazorpayGateway`] talks to the
//! real provider; [`UnconfiguredGateway`] stands in when credentials are
//! absent and refuses every operation with a distinguishable error.

use std::collections::HashMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{error, instrument};

use crate::errors::ServiceError;
use crate::models::GatewayOrder;

type HmacSha256 = Hmac<Sha256>;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a gateway-side payment order. `amount_minor` is in the
    /// gateway's minor-unit convention (paise).
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder, ServiceError>;

    /// Verifies a payment callback signature against the original order id.
    fn verify_signature(&self, gateway_order_id: &str, gateway_payment_id: &str, signature: &str)
        -> bool;
}

/// Computes the callback signature the gateway sends: HMAC-SHA256 over
/// `"{order_id}|{payment_id}"` with the shared key secret, hex-encoded.
/// Exposed so tests can forge valid callbacks against a known secret.
pub fn sign_callback(secret: &str, gateway_order_id: &str, gateway_payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

pub struct RazorpayGateway {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
    base_url: String,
}

impl RazorpayGateway {
    pub fn new(key_id: String, key_secret: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_id,
            key_secret,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, notes))]
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt: &str,
        notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder, ServiceError> {
        let body = serde_json::json!({
            "amount": amount_minor,
            "currency": currency,
            "receipt": receipt,
            "notes": notes,
        });

        let response = self
            .http
            .post(format!("{}/v1/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("gateway order creation failed: {}", e);
                ServiceError::PaymentGatewayUnavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "gateway rejected order creation");
            return Err(ServiceError::PaymentGatewayUnavailable(format!(
                "gateway returned {status}"
            )));
        }

        let order: GatewayOrderResponse = response.json().await.map_err(|e| {
            ServiceError::PaymentGatewayUnavailable(format!("malformed gateway response: {e}"))
        })?;

        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        let expected = sign_callback(&self.key_secret, gateway_order_id, gateway_payment_id);
        constant_time_eq(&expected, signature)
    }
}

/// Placeholder wired when gateway credentials are not configured. Every
/// operation fails loudly; nothing ever falls back to an unverified path.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn create_order(
        &self,
        _amount_minor: i64,
        _currency: &str,
        _receipt: &str,
        _notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder, ServiceError> {
        Err(ServiceError::PaymentGatewayUnavailable(
            "payment gateway credentials are not configured".to_string(),
        ))
    }

    fn verify_signature(
        &self,
        _gateway_order_id: &str,
        _gateway_payment_id: &str,
        _signature: &str,
    ) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "gateway_test_secret";

    fn gateway() -> RazorpayGateway {
        RazorpayGateway::new(
            "rzp_test_key".to_string(),
            SECRET.to_string(),
            "https://api.razorpay.com".to_string(),
        )
    }

    #[test]
    fn valid_signature_verifies() {
        let sig = sign_callback(SECRET, "order_1", "pay_1");
        assert!(gateway().verify_signature("order_1", "pay_1", &sig));
    }

    #[test]
    fn signature_binds_order_and_payment() {
        let sig = sign_callback(SECRET, "order_1", "pay_1");
        assert!(!gateway().verify_signature("order_2", "pay_1", &sig));
        assert!(!gateway().verify_signature("order_1", "pay_2", &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let sig = sign_callback("some_other_secret", "order_1", "pay_1");
        assert!(!gateway().verify_signature("order_1", "pay_1", &sig));
    }

    #[test]
    fn tampered_signature_fails_verification() {
        let mut sig = sign_callback(SECRET, "order_1", "pay_1");
        let flipped = if sig.ends_with('0') { '1' } else { '0' };
        sig.pop();
        sig.push(flipped);
        assert!(!gateway().verify_signature("order_1", "pay_1", &sig));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }

    #[tokio::test]
    async fn unconfigured_gateway_refuses_everything() {
        let gw = UnconfiguredGateway;
        let err = gw
            .create_order(100, "INR", "rcpt_1", &HashMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PaymentGatewayUnavailable(_)));
        assert!(!gw.verify_signature("order_1", "pay_1", "anything"));
    }
}
