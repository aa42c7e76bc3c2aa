//! Domain types shared across services and handlers.
//!
//! All monetary amounts are whole-rupee integers. Conversion to the
//! gateway's minor units (paise) happens only at the gateway boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Paise per rupee, the gateway's minor-unit convention.
pub const MINOR_UNITS_PER_RUPEE: i64 = 100;

/// Quantity bounds enforced server-side per line item.
pub const MIN_LINE_QUANTITY: i64 = 1;
pub const MAX_LINE_QUANTITY: i64 = 100;

/// A client-requested line item. Untrusted apart from the identifier and
/// quantity; any price field a client smuggles in is dropped at
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LineItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// A line item whose unit price was read from the product store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolvedLineItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
}

/// The authoritative pricing result. This is the only value ever passed
/// to the payment gateway or persisted as an order's charged amount.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifiedPricing {
    pub verified_subtotal: i64,
    pub discount: i64,
    pub final_total: i64,
    pub resolved_items: Vec<ResolvedLineItem>,
    /// Normalized (uppercased) coupon code, if one was applied.
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    Percentage,
    Flat,
}

/// Persisted coupon entity. Read-only from the pricing engine's
/// perspective; `usage_count` moves only through the redemption hook.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub code: String,
    #[serde(rename = "type")]
    pub coupon_type: CouponType,
    pub value: i64,
    pub is_active: bool,
    pub expiry_date: DateTime<Utc>,
    pub usage_limit: i64,
    pub usage_count: i64,
    pub min_order_amount: i64,
}

/// A product document as stored. `price` is a display-formatted string
/// (e.g. "₹1,599"); parsing to an integer happens in exactly one adapter,
/// `store::price::parse_display_price`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductRecord {
    /// Explicit identifier field. Legacy documents may carry a value here
    /// that differs from their document id; lookups tolerate both.
    pub id: String,
    pub name: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, validator::Validate)]
pub struct Address {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: String,
    #[validate(length(min = 4))]
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Online,
    Cod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

/// Persisted order. Created exactly once per successful checkout;
/// immutable afterwards except for `status`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub items: Vec<ResolvedLineItem>,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub payment_method: PaymentMethod,
    /// Gateway payment id; attached only at settlement commit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_order_id: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Builds an order from verified pricing. Payment identifiers are not
    /// set here; the settlement commit is the single place they attach.
    pub fn from_pricing(
        user_id: &str,
        pricing: &VerifiedPricing,
        address: Option<Address>,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            items: pricing.resolved_items.clone(),
            subtotal: pricing.verified_subtotal,
            discount: pricing.discount,
            total: pricing.final_total,
            coupon_code: pricing.coupon_code.clone(),
            address,
            payment_method,
            payment_id: None,
            gateway_order_id: None,
            status: OrderStatus::default(),
            created_at: Utc::now(),
        }
    }
}

/// Gateway-side payment order, as returned by order creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayOrder {
    pub id: String,
    /// Amount in minor units (paise).
    pub amount: i64,
    pub currency: String,
}

/// Server-side checkout state captured at payment-order initiation and
/// consumed at settlement. The settlement path never re-prices from
/// client input; it reads this record instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub gateway_order_id: String,
    pub user_id: String,
    pub pricing: VerifiedPricing,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pricing() -> VerifiedPricing {
        VerifiedPricing {
            verified_subtotal: 3198,
            discount: 319,
            final_total: 2879,
            resolved_items: vec![ResolvedLineItem {
                product_id: "sku-1".into(),
                quantity: 2,
                unit_price: 1599,
                line_total: 3198,
            }],
            coupon_code: Some("SAVE10".into()),
        }
    }

    #[test]
    fn order_from_pricing_carries_verified_amounts() {
        let order = Order::from_pricing("user-1", &sample_pricing(), None, PaymentMethod::Online);
        assert_eq!(order.subtotal, 3198);
        assert_eq!(order.discount, 319);
        assert_eq!(order.total, 2879);
        assert_eq!(order.coupon_code.as_deref(), Some("SAVE10"));
        assert!(order.payment_id.is_none());
        assert!(order.gateway_order_id.is_none());
        assert_eq!(order.status, OrderStatus::Placed);
    }

    #[test]
    fn line_item_request_drops_client_price_fields() {
        let raw = r#"{"product_id":"sku-1","quantity":2,"unit_price":1,"total":1}"#;
        let item: LineItemRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(item.product_id, "sku-1");
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn coupon_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CouponType::Percentage).unwrap(),
            "\"percentage\""
        );
        assert_eq!(serde_json::to_string(&CouponType::Flat).unwrap(), "\"flat\"");
    }
}
