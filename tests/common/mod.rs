use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use storefront_api::{
    auth::{Claims, JwtIdentityResolver},
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    handlers::AppServices,
    models::{Coupon, CouponType, GatewayOrder, ProductRecord},
    rate_limiter::{RateLimitConfig, RateLimiter},
    security::OriginPolicy,
    services::payments::{sign_callback, PaymentGateway},
    store::MemoryStore,
    AppState,
};

pub const JWT_SECRET: &str =
    "k9fQ2mX7vL4pR8sW1zG5hJ3nB6tY0cE9uI2oA7dK4gM8qV5xS1wZ3rT6yN0bH4jP";
pub const GATEWAY_SECRET: &str = "gateway_shared_secret_for_tests";
pub const ALLOWED_ORIGIN: &str = "https://shop.example.com";

/// Gateway double: real signature scheme, deterministic order ids, no
/// network.
pub struct FakeGateway {
    counter: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        _receipt: &str,
        _notes: &HashMap<String, String>,
    ) -> Result<GatewayOrder, ServiceError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            id: format!("order_test{n}"),
            amount: amount_minor,
            currency: currency.to_string(),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        sign_callback(GATEWAY_SECRET, order_id, payment_id) == signature
    }
}

/// Signs a callback the way the test gateway expects.
pub fn gateway_signature(order_id: &str, payment_id: &str) -> String {
    sign_callback(GATEWAY_SECRET, order_id, payment_id)
}

/// Helper harness driving the real router against the in-memory store.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    token: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(Arc::new(FakeGateway::new()), 50)
    }

    pub fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self::build(gateway, 50)
    }

    pub fn with_rate_limit(requests_per_window: u32) -> Self {
        Self::build(Arc::new(FakeGateway::new()), requests_per_window)
    }

    fn build(gateway: Arc<dyn PaymentGateway>, requests_per_window: u32) -> Self {
        let store = Arc::new(MemoryStore::new());

        let cfg = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            auth_issuer: "storefront-api".to_string(),
            auth_audience: "storefront".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            cors_allowed_origins: Some(ALLOWED_ORIGIN.to_string()),
            cors_allow_any_origin: false,
            cors_allow_credentials: false,
            rate_limit_requests_per_window: requests_per_window,
            rate_limit_window_seconds: 60,
            gateway_key_id: None,
            gateway_key_secret: None,
            gateway_base_url: "https://api.razorpay.com".to_string(),
            default_currency: "INR".to_string(),
        };

        let (event_sender, event_rx) = EventSender::channel(256);
        tokio::spawn(storefront_api::events::process_events(event_rx));

        let services = AppServices::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            gateway,
            event_sender.clone(),
            cfg.default_currency.clone(),
        );

        let checkout_limiter = RateLimiter::new(RateLimitConfig {
            requests_per_window,
            window_duration: Duration::from_secs(cfg.rate_limit_window_seconds),
        });

        let state = AppState {
            origin_policy: OriginPolicy::from_config(&cfg),
            identity: Arc::new(JwtIdentityResolver::new(
                &cfg.jwt_secret,
                &cfg.auth_issuer,
                &cfg.auth_audience,
            )),
            config: cfg,
            services,
            orders: store.clone(),
            checkout_limiter,
            event_sender,
        };

        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .with_state(state);

        let token = issue_token("user-1");
        Self {
            router,
            store,
            token,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn seed_product(&self, doc_id: &str, name: &str, price: &str) {
        self.store.seed_product(
            doc_id,
            ProductRecord {
                id: doc_id.to_string(),
                name: name.to_string(),
                price: price.to_string(),
                category: Some("kurtas".to_string()),
                description: None,
                image_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
    }

    pub fn seed_percentage_coupon(&self, code: &str, value: i64, min_order_amount: i64) {
        self.store.seed_coupon(Coupon {
            code: code.to_string(),
            coupon_type: CouponType::Percentage,
            value,
            is_active: true,
            expiry_date: Utc::now() + chrono::Duration::days(30),
            usage_limit: 100,
            usage_count: 0,
            min_order_amount,
        });
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        self.request_with_headers(method, uri, body, token, &[]).await
    }

    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

/// Issues a bearer token the app's identity resolver accepts.
pub fn issue_token(user_id: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email: Some(format!("{user_id}@example.com")),
        iat: now,
        exp: now + 3600,
        iss: "storefront-api".to_string(),
        aud: "storefront".to_string(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode access token")
}

#[allow(dead_code)]
pub fn unique_user() -> String {
    format!("user-{}", Uuid::new_v4().simple())
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
