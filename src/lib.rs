//! Storefront API Library
//!
//! This crate provides the checkout pricing and payment-settlement
//! backend for a direct-to-consumer clothing storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod openapi;
pub mod rate_limiter;
pub mod security;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::auth::IdentityResolver;
use crate::store::OrderStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
    pub orders: Arc<dyn OrderStore>,
    pub identity: Arc<dyn IdentityResolver>,
    pub origin_policy: security::OriginPolicy,
    pub checkout_limiter: rate_limiter::RateLimiter,
    pub event_sender: events::EventSender,
}

/// Full v1 API surface.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/checkout", handlers::checkout::checkout_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest("/products", handlers::products::products_routes())
}

async fn api_status() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    Json(json!({
        "status": "ok",
        "version": version,
        "service": "storefront-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    }))
}

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
