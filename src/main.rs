use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use http::HeaderValue;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use storefront_api as api;

use api::services::payments::{PaymentGateway, RazorpayGateway, UnconfiguredGateway};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Backing document store. The in-memory implementation is the default
    // wiring; a hosted-store client implements the same traits.
    let store = Arc::new(api::store::MemoryStore::new());
    warn!("using in-memory document store; data does not survive restarts");

    // Payment gateway from credentials; absent credentials wire a
    // placeholder that refuses every operation loudly.
    let gateway: Arc<dyn PaymentGateway> =
        match (cfg.gateway_key_id.clone(), cfg.gateway_key_secret.clone()) {
            (Some(key_id), Some(key_secret)) => {
                info!("payment gateway configured");
                Arc::new(RazorpayGateway::new(
                    key_id,
                    key_secret,
                    cfg.gateway_base_url.clone(),
                ))
            }
            _ => {
                warn!("payment gateway credentials missing; online checkout will be unavailable");
                Arc::new(UnconfiguredGateway)
            }
        };

    let identity = Arc::new(api::auth::JwtIdentityResolver::new(
        &cfg.jwt_secret,
        &cfg.auth_issuer,
        &cfg.auth_audience,
    ));

    // Init events
    let (event_sender, event_rx) = api::events::EventSender::channel(1024);
    tokio::spawn(api::events::process_events(event_rx));

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        gateway,
        event_sender.clone(),
        cfg.default_currency.clone(),
    );

    let checkout_limiter = api::rate_limiter::RateLimiter::new(api::rate_limiter::RateLimitConfig {
        requests_per_window: cfg.rate_limit_requests_per_window,
        window_duration: Duration::from_secs(cfg.rate_limit_window_seconds),
    });

    // Compose shared app state
    let app_state = api::AppState {
        origin_policy: api::security::OriginPolicy::from_config(&cfg),
        config: cfg.clone(),
        services,
        orders: store,
        identity,
        checkout_limiter,
        event_sender,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::PUT,
                http::Method::DELETE,
            ])
            .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
            .allow_credentials(cfg.cors_allow_credentials)
    } else if cfg.should_allow_permissive_cors() {
        info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        error!("Missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true");
        return Err(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .into(),
        );
    };

    // Build router: root + full v1 API + Swagger UI
    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "storefront-api up" }))
        .route("/health", get(api::health_check))
        .nest("/api/v1", api::api_v1_routes())
        .merge(api::openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors_layer)
        .with_state(app_state);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("🚀 storefront-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
