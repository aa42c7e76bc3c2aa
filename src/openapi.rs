use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::handlers;
use crate::models::{
    Address, Coupon, LineItemRequest, Order, OrderStatus, PaymentMethod, ResolvedLineItem,
    VerifiedPricing,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.3.0",
        description = r#"
Checkout and order backend for a direct-to-consumer clothing storefront.

Cart totals are always re-derived server-side from the product store;
nothing a client sends about prices or discounts is trusted. Online
payments settle through a signature-verified gateway callback with an
idempotent, exactly-once order commit keyed by the gateway payment id.

All checkout and order endpoints require a bearer identity token:

```
Authorization: Bearer <token>
```
        "#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::checkout::create_payment_order,
        handlers::checkout::verify_payment,
        handlers::checkout::validate_cod,
        handlers::orders::list_orders,
        handlers::products::list_products,
    ),
    components(schemas(
        ErrorResponse,
        LineItemRequest,
        ResolvedLineItem,
        VerifiedPricing,
        Address,
        Coupon,
        Order,
        OrderStatus,
        PaymentMethod,
        handlers::checkout::CreateOrderRequest,
        handlers::checkout::CreateOrderResponse,
        handlers::checkout::VerifyPaymentRequest,
        handlers::checkout::VerifyPaymentResponse,
        handlers::checkout::CodValidateRequest,
        handlers::checkout::CodValidateResponse,
        handlers::products::ProductRequest,
        handlers::products::ProductResponse,
    )),
    tags(
        (name = "Checkout", description = "Verified pricing, payment orders, settlement"),
        (name = "Orders", description = "Customer order lookup"),
        (name = "Products", description = "Catalog browsing and admin management")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
