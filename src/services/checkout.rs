//! The order pricing engine and the two order-creating entry points that
//! do not involve a payment callback: payment-order initiation (online)
//! and cash-on-delivery validation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{
    Address, LineItemRequest, Order, PaymentMethod, PendingCheckout, VerifiedPricing,
    MINOR_UNITS_PER_RUPEE,
};
use crate::services::coupons::{CouponService, RedemptionHook};
use crate::services::payments::PaymentGateway;
use crate::services::pricing::PricingService;
use crate::store::{OrderStore, PendingCheckoutStore};

/// Everything the client needs to launch the gateway's payment flow,
/// plus the verification breakdown for rendering an accurate summary.
/// The client never echoes any of this back as the charge amount.
#[derive(Debug, Clone)]
pub struct PaymentOrderInitiation {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub pricing: VerifiedPricing,
}

#[derive(Clone)]
pub struct CheckoutService {
    pricing: Arc<PricingService>,
    coupons: Arc<CouponService>,
    orders: Arc<dyn OrderStore>,
    pending: Arc<dyn PendingCheckoutStore>,
    gateway: Arc<dyn PaymentGateway>,
    redemption: Arc<dyn RedemptionHook>,
    events: EventSender,
    currency: String,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pricing: Arc<PricingService>,
        coupons: Arc<CouponService>,
        orders: Arc<dyn OrderStore>,
        pending: Arc<dyn PendingCheckoutStore>,
        gateway: Arc<dyn PaymentGateway>,
        redemption: Arc<dyn RedemptionHook>,
        events: EventSender,
        currency: String,
    ) -> Self {
        Self {
            pricing,
            coupons,
            orders,
            pending,
            gateway,
            redemption,
            events,
            currency,
        }
    }

    /// Re-derives an order's true price from store-held data. The sole
    /// place where "what the customer is charged" is decided; nothing a
    /// client declares about totals or discounts is consulted.
    #[instrument(skip(self, items))]
    pub async fn price_order(
        &self,
        items: &[LineItemRequest],
        coupon_code: Option<&str>,
    ) -> Result<VerifiedPricing, ServiceError> {
        let (resolved_items, verified_subtotal) = self.pricing.resolve(items).await?;
        let evaluation = self.coupons.evaluate(coupon_code, verified_subtotal).await?;

        let final_total = verified_subtotal - evaluation.discount;
        if final_total < 1 {
            return Err(ServiceError::OrderTotalTooLow);
        }

        Ok(VerifiedPricing {
            verified_subtotal,
            discount: evaluation.discount,
            final_total,
            resolved_items,
            coupon_code: evaluation.code,
        })
    }

    /// Prices the cart and creates a gateway order for the verified
    /// amount. The verified pricing is persisted keyed by the gateway
    /// order id so settlement can commit from trusted server-side state.
    #[instrument(skip(self, items), fields(user_id = %user_id))]
    pub async fn initiate_payment(
        &self,
        user_id: &str,
        items: &[LineItemRequest],
        coupon_code: Option<&str>,
        receipt: Option<String>,
    ) -> Result<PaymentOrderInitiation, ServiceError> {
        let pricing = self.price_order(items, coupon_code).await?;
        let amount_minor = pricing.final_total * MINOR_UNITS_PER_RUPEE;

        let receipt = receipt.unwrap_or_else(|| format!("rcpt_{:08x}", rand::random::<u32>()));
        let notes = HashMap::from([
            ("user_id".to_string(), user_id.to_string()),
            (
                "item_count".to_string(),
                pricing.resolved_items.len().to_string(),
            ),
            (
                "verified_subtotal".to_string(),
                pricing.verified_subtotal.to_string(),
            ),
            ("discount".to_string(), pricing.discount.to_string()),
            (
                "coupon".to_string(),
                pricing.coupon_code.clone().unwrap_or_else(|| "none".to_string()),
            ),
        ]);

        let gateway_order = self
            .gateway
            .create_order(amount_minor, &self.currency, &receipt, &notes)
            .await?;

        self.pending
            .put(PendingCheckout {
                gateway_order_id: gateway_order.id.clone(),
                user_id: user_id.to_string(),
                pricing: pricing.clone(),
                created_at: Utc::now(),
            })
            .await?;

        self.events
            .send(Event::CheckoutInitiated {
                gateway_order_id: gateway_order.id.clone(),
                user_id: user_id.to_string(),
                amount_minor: gateway_order.amount,
            })
            .await;

        info!(
            gateway_order_id = %gateway_order.id,
            final_total = pricing.final_total,
            "payment order created"
        );

        Ok(PaymentOrderInitiation {
            gateway_order_id: gateway_order.id,
            amount_minor: gateway_order.amount,
            currency: gateway_order.currency,
            pricing,
        })
    }

    /// Cash-on-delivery path: re-prices at order-creation time and
    /// commits directly, with no gateway order involved.
    #[instrument(skip(self, items, address), fields(user_id = %user_id))]
    pub async fn validate_cod(
        &self,
        user_id: &str,
        items: &[LineItemRequest],
        coupon_code: Option<&str>,
        address: Option<Address>,
    ) -> Result<Order, ServiceError> {
        let pricing = self.price_order(items, coupon_code).await?;

        let order = Order::from_pricing(user_id, &pricing, address, PaymentMethod::Cod);
        let order = self.orders.insert(order).await?;

        if let Some(code) = &order.coupon_code {
            if let Err(err) = self.redemption.coupon_redeemed(code, order.id).await {
                // The order is committed; a lost increment is preferable to
                // failing the order or double-counting on a client retry.
                error!(%code, order_id = %order.id, "redemption hook failed: {}", err);
            }
        }

        self.events
            .send(Event::OrderCreated {
                order_id: order.id,
                user_id: user_id.to_string(),
                total: order.total,
                payment_method: PaymentMethod::Cod,
            })
            .await;

        Ok(order)
    }
}
