//! Coupon eligibility and discount computation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::CouponType;
use crate::store::CouponStore;

/// Result of evaluating a coupon against a verified subtotal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponEvaluation {
    pub discount: i64,
    /// Normalized code, present only when a coupon was applied.
    pub code: Option<String>,
}

impl CouponEvaluation {
    fn none() -> Self {
        Self {
            discount: 0,
            code: None,
        }
    }
}

/// Validates coupons and computes discounts. Evaluation is read-only;
/// usage counts move through [`RedemptionHook`] at order commit.
#[derive(Clone)]
pub struct CouponService {
    coupons: Arc<dyn CouponStore>,
}

impl CouponService {
    pub fn new(coupons: Arc<dyn CouponStore>) -> Self {
        Self { coupons }
    }

    /// Evaluates an optional coupon code against a verified subtotal.
    /// Codes are case-insensitive. An absent or blank code yields a zero
    /// discount without error; every other failure is surfaced with its
    /// specific kind, never silently defaulted.
    #[instrument(skip(self))]
    pub async fn evaluate(
        &self,
        code: Option<&str>,
        subtotal: i64,
    ) -> Result<CouponEvaluation, ServiceError> {
        let raw = match code {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(CouponEvaluation::none()),
        };
        let normalized = raw.trim().to_uppercase();

        let coupon = self
            .coupons
            .find_active(&normalized)
            .await?
            .ok_or(ServiceError::CouponInvalid)?;

        if coupon.expiry_date < Utc::now() {
            return Err(ServiceError::CouponExpired);
        }
        if coupon.usage_count >= coupon.usage_limit {
            return Err(ServiceError::CouponExhausted);
        }
        if subtotal < coupon.min_order_amount {
            return Err(ServiceError::CouponMinimumNotMet {
                required: coupon.min_order_amount,
            });
        }

        let discount = match coupon.coupon_type {
            CouponType::Percentage => subtotal * coupon.value / 100,
            CouponType::Flat => coupon.value,
        }
        .clamp(0, subtotal);

        Ok(CouponEvaluation {
            discount,
            code: Some(normalized),
        })
    }
}

/// Fired exactly once per committed order that carried a coupon, on the
/// same idempotency key as the order commit itself.
#[async_trait]
pub trait RedemptionHook: Send + Sync {
    async fn coupon_redeemed(&self, code: &str, order_id: Uuid) -> Result<(), ServiceError>;
}

/// Default hook: bumps the coupon's usage count in the store and emits a
/// redemption event.
pub struct CouponUsageRecorder {
    coupons: Arc<dyn CouponStore>,
    events: EventSender,
}

impl CouponUsageRecorder {
    pub fn new(coupons: Arc<dyn CouponStore>, events: EventSender) -> Self {
        Self { coupons, events }
    }
}

#[async_trait]
impl RedemptionHook for CouponUsageRecorder {
    async fn coupon_redeemed(&self, code: &str, order_id: Uuid) -> Result<(), ServiceError> {
        self.coupons.record_redemption(code).await?;
        self.events
            .send(Event::CouponRedeemed {
                code: code.to_string(),
                order_id,
            })
            .await;
        Ok(())
    }
}
