use std::sync::Arc;

use validator::Validate;

use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::catalog::CatalogService;
use crate::services::checkout::CheckoutService;
use crate::services::coupons::{CouponService, CouponUsageRecorder};
use crate::services::payments::PaymentGateway;
use crate::services::pricing::PricingService;
use crate::services::settlement::SettlementService;
use crate::store::{CouponStore, OrderStore, PendingCheckoutStore, ProductStore};

pub mod checkout;
pub mod orders;
pub mod products;

/// Aggregated services used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub settlement: Arc<SettlementService>,
    pub catalog: Arc<CatalogService>,
}

impl AppServices {
    /// Wires the service graph from store and gateway capabilities. The
    /// coupon redemption hook is shared by both commit paths, so a coupon
    /// is counted once per order regardless of payment method.
    pub fn new(
        products: Arc<dyn ProductStore>,
        coupons: Arc<dyn CouponStore>,
        orders: Arc<dyn OrderStore>,
        pending: Arc<dyn PendingCheckoutStore>,
        gateway: Arc<dyn PaymentGateway>,
        events: EventSender,
        currency: String,
    ) -> Self {
        let pricing = Arc::new(PricingService::new(products.clone()));
        let coupon_service = Arc::new(CouponService::new(coupons.clone()));
        let redemption = Arc::new(CouponUsageRecorder::new(coupons, events.clone()));

        let checkout = Arc::new(CheckoutService::new(
            pricing,
            coupon_service,
            orders.clone(),
            pending.clone(),
            gateway.clone(),
            redemption.clone(),
            events.clone(),
            currency,
        ));

        let settlement = Arc::new(SettlementService::new(
            orders,
            pending,
            gateway,
            redemption,
            events.clone(),
        ));

        let catalog = Arc::new(CatalogService::new(products, events));

        Self {
            checkout,
            settlement,
            catalog,
        }
    }
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}
