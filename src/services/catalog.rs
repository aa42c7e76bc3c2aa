//! Product catalog management backing the admin panel.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::models::ProductRecord;
use crate::store::{price::parse_display_price, ProductStore};

/// Input for product creation and update.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    /// Display-formatted price string; must parse to a positive amount.
    pub price: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductStore>,
    events: EventSender,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductStore>, events: EventSender) -> Self {
        Self { products, events }
    }

    pub async fn list(&self) -> Result<Vec<(String, ProductRecord)>, ServiceError> {
        self.products.list().await
    }

    pub async fn get(&self, doc_id: &str) -> Result<ProductRecord, ServiceError> {
        self.products
            .get(doc_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {doc_id} not found")))
    }

    /// Creates a product. New documents are written with the explicit id
    /// equal to the document id, so only legacy data needs the dual-id
    /// lookup shim.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: ProductInput) -> Result<(String, ProductRecord), ServiceError> {
        Self::validated_price(&input.price)?;

        let doc_id = Uuid::new_v4().simple().to_string();
        let now = Utc::now();
        let record = ProductRecord {
            id: doc_id.clone(),
            name: input.name,
            price: input.price,
            category: input.category,
            description: input.description,
            image_url: input.image_url,
            created_at: now,
            updated_at: now,
        };

        self.products.insert(doc_id.clone(), record.clone()).await?;
        self.events
            .send(Event::ProductUpserted {
                product_id: doc_id.clone(),
            })
            .await;

        Ok((doc_id, record))
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        doc_id: &str,
        input: ProductInput,
    ) -> Result<ProductRecord, ServiceError> {
        Self::validated_price(&input.price)?;

        let existing = self.get(doc_id).await?;
        let record = ProductRecord {
            id: existing.id,
            name: input.name,
            price: input.price,
            category: input.category,
            description: input.description,
            image_url: input.image_url,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };

        if !self.products.update(doc_id, record.clone()).await? {
            return Err(ServiceError::NotFound(format!("Product {doc_id} not found")));
        }
        self.events
            .send(Event::ProductUpserted {
                product_id: doc_id.to_string(),
            })
            .await;

        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, doc_id: &str) -> Result<(), ServiceError> {
        if !self.products.delete(doc_id).await? {
            return Err(ServiceError::NotFound(format!("Product {doc_id} not found")));
        }
        self.events
            .send(Event::ProductDeleted {
                product_id: doc_id.to_string(),
            })
            .await;
        Ok(())
    }

    fn validated_price(price: &str) -> Result<i64, ServiceError> {
        let unit_price = parse_display_price(price).map_err(|_| {
            ServiceError::ValidationError(format!("price {price:?} is not a valid amount"))
        })?;
        if unit_price < 1 {
            return Err(ServiceError::ValidationError(
                "product price must be at least 1".to_string(),
            ));
        }
        Ok(unit_price)
    }
}
