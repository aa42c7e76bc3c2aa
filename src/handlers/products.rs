//! Product catalog endpoints. Reads are public (the storefront browses
//! anonymously); mutations back the admin panel and require identity.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::validate_input;
use crate::models::ProductRecord;
use crate::services::catalog::ProductInput;
use crate::store::price::parse_display_price;
use crate::AppState;

pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    /// Display-formatted price as stored.
    pub price: String,
    /// Parsed whole-rupee amount, the value checkout actually charges.
    pub unit_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn to_response(doc_id: String, record: ProductRecord) -> Result<ProductResponse, ServiceError> {
    let unit_price = parse_display_price(&record.price)?;
    Ok(ProductResponse {
        id: doc_id,
        name: record.name,
        price: record.price,
        unit_price,
        category: record.category,
        description: record.description,
        image_url: record.image_url,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

/// List all products in the catalog.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses((status = 200, description = "Product catalog", body = [ProductResponse])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ServiceError> {
    let products = state
        .services
        .catalog
        .list()
        .await?
        .into_iter()
        .map(|(doc_id, record)| to_response(doc_id, record))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(products))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ServiceError> {
    let record = state.services.catalog.get(&id).await?;
    Ok(Json(to_response(id, record)?))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub price: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl From<ProductRequest> for ProductInput {
    fn from(req: ProductRequest) -> Self {
        ProductInput {
            name: req.name,
            price: req.price,
            category: req.category,
            description: req.description,
            image_url: req.image_url,
        }
    }
}

async fn create_product(
    State(state): State<AppState>,
    _admin: AuthUser,
    Json(payload): Json<ProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let (doc_id, record) = state.services.catalog.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(to_response(doc_id, record)?)))
}

async fn update_product(
    State(state): State<AppState>,
    _admin: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, ServiceError> {
    validate_input(&payload)?;
    let record = state.services.catalog.update(&id, payload.into()).await?;
    Ok(Json(to_response(id, record)?))
}

async fn delete_product(
    State(state): State<AppState>,
    _admin: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.services.catalog.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
