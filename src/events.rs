use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::PaymentMethod;

// Define the events that can occur in the checkout pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutInitiated {
        gateway_order_id: String,
        user_id: String,
        amount_minor: i64,
    },
    OrderCreated {
        order_id: Uuid,
        user_id: String,
        total: i64,
        payment_method: PaymentMethod,
    },
    PaymentSettled {
        order_id: Uuid,
        payment_id: String,
    },
    PaymentVerificationFailed {
        gateway_order_id: String,
        payment_id: String,
    },
    CouponRedeemed {
        code: String,
        order_id: Uuid,
    },
    ProductUpserted {
        product_id: String,
    },
    ProductDeleted {
        product_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Builds a sender plus the receiver to hand to [`process_events`].
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event; delivery is best-effort and never fails the
    /// operation that emitted it.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            error!("Failed to send event: {}", e);
        }
    }
}

/// Event processing loop. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::CheckoutInitiated {
                gateway_order_id,
                user_id,
                amount_minor,
            } => {
                info!(
                    %gateway_order_id,
                    %user_id,
                    amount_minor,
                    "checkout initiated"
                );
            }
            Event::OrderCreated {
                order_id,
                user_id,
                total,
                payment_method,
            } => {
                info!(%order_id, %user_id, total, ?payment_method, "order created");
            }
            Event::PaymentSettled {
                order_id,
                payment_id,
            } => {
                info!(%order_id, %payment_id, "payment settled");
            }
            Event::PaymentVerificationFailed {
                gateway_order_id,
                payment_id,
            } => {
                warn!(
                    %gateway_order_id,
                    %payment_id,
                    "payment signature verification failed"
                );
            }
            Event::CouponRedeemed { code, order_id } => {
                info!(%code, %order_id, "coupon redeemed");
            }
            Event::ProductUpserted { product_id } => {
                info!(%product_id, "product upserted");
            }
            Event::ProductDeleted { product_id } => {
                info!(%product_id, "product deleted");
            }
        }
    }

    info!("Event processing loop stopped");
}
