//! Payment settlement: callback verification and exactly-once order
//! commit.
//!
//! The handler walks a short state machine: verify the callback
//! signature, check whether this payment already produced an order,
//! and if not, commit an order built from the pricing captured at
//! initiation. The commit is a first-writer-wins insert keyed by the
//! gateway payment id, so duplicate and concurrent callback deliveries
//! converge on one persisted order.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::{Address, Order, PaymentMethod};
use crate::services::coupons::RedemptionHook;
use crate::services::payments::PaymentGateway;
use crate::store::{CommitOutcome, OrderStore, PendingCheckoutStore};

/// The gateway's payment callback. Untrusted until the signature checks
/// out against the shared secret and the original order id.
#[derive(Debug, Clone)]
pub struct PaymentCallback {
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// This callback won the commit; the order was created now.
    Committed(Order),
    /// The payment had already been settled; nothing was created.
    AlreadyProcessed { order_id: Uuid },
}

#[derive(Clone)]
pub struct SettlementService {
    orders: Arc<dyn OrderStore>,
    pending: Arc<dyn PendingCheckoutStore>,
    gateway: Arc<dyn PaymentGateway>,
    redemption: Arc<dyn RedemptionHook>,
    events: EventSender,
}

impl SettlementService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        pending: Arc<dyn PendingCheckoutStore>,
        gateway: Arc<dyn PaymentGateway>,
        redemption: Arc<dyn RedemptionHook>,
        events: EventSender,
    ) -> Self {
        Self {
            orders,
            pending,
            gateway,
            redemption,
            events,
        }
    }

    /// Settles a payment callback. At most one order is ever created per
    /// distinct gateway payment id; replays and concurrent deliveries
    /// observe `AlreadyProcessed`. A signature mismatch is terminal and
    /// commits nothing. Transient store failures surface as errors and
    /// are safe to retry with the same callback.
    #[instrument(
        skip(self, callback, address),
        fields(
            gateway_order_id = %callback.gateway_order_id,
            gateway_payment_id = %callback.gateway_payment_id,
        )
    )]
    pub async fn settle(
        &self,
        user_id: &str,
        callback: &PaymentCallback,
        address: Option<Address>,
    ) -> Result<SettlementOutcome, ServiceError> {
        if !self.gateway.verify_signature(
            &callback.gateway_order_id,
            &callback.gateway_payment_id,
            &callback.signature,
        ) {
            warn!("payment callback failed signature verification");
            self.events
                .send(Event::PaymentVerificationFailed {
                    gateway_order_id: callback.gateway_order_id.clone(),
                    payment_id: callback.gateway_payment_id.clone(),
                })
                .await;
            return Err(ServiceError::PaymentVerificationFailed);
        }

        // Fast path: the payment already produced an order. The atomic
        // commit below re-checks, so a racing duplicate that slips past
        // here still cannot create a second order.
        if let Some(existing) = self
            .orders
            .find_by_payment_id(&callback.gateway_payment_id)
            .await?
        {
            info!(order_id = %existing.id, "payment already processed");
            return Ok(SettlementOutcome::AlreadyProcessed {
                order_id: existing.id,
            });
        }

        // The order is built from the pricing captured at initiation;
        // client input plays no part at this stage.
        let pending = self
            .pending
            .get(&callback.gateway_order_id)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "no pending checkout for gateway order {}",
                    callback.gateway_order_id
                ))
            })?;

        if pending.user_id != user_id {
            warn!(owner = %pending.user_id, caller = %user_id, "settlement caller mismatch");
            return Err(ServiceError::ValidationError(
                "checkout session belongs to a different user".to_string(),
            ));
        }

        let mut order = Order::from_pricing(
            &pending.user_id,
            &pending.pricing,
            address,
            PaymentMethod::Online,
        );
        order.payment_id = Some(callback.gateway_payment_id.clone());
        order.gateway_order_id = Some(callback.gateway_order_id.clone());

        match self
            .orders
            .commit_paid_order(&callback.gateway_payment_id, order)
            .await?
        {
            CommitOutcome::Created(order) => {
                if let Some(code) = &order.coupon_code {
                    if let Err(err) = self.redemption.coupon_redeemed(code, order.id).await {
                        // The commit stands; losing one increment beats
                        // double-counting on a retried callback.
                        error!(%code, order_id = %order.id, "redemption hook failed: {}", err);
                    }
                }

                if let Err(err) = self.pending.remove(&callback.gateway_order_id).await {
                    warn!("failed to clear pending checkout: {}", err);
                }

                self.events
                    .send(Event::OrderCreated {
                        order_id: order.id,
                        user_id: order.user_id.clone(),
                        total: order.total,
                        payment_method: PaymentMethod::Online,
                    })
                    .await;
                self.events
                    .send(Event::PaymentSettled {
                        order_id: order.id,
                        payment_id: callback.gateway_payment_id.clone(),
                    })
                    .await;

                info!(order_id = %order.id, "order committed for payment");
                Ok(SettlementOutcome::Committed(order))
            }
            CommitOutcome::AlreadyProcessed { order_id } => {
                info!(%order_id, "lost settlement race; payment already committed");
                Ok(SettlementOutcome::AlreadyProcessed { order_id })
            }
        }
    }
}
