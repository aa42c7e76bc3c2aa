//! Price resolution against the authoritative product store.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::instrument;

use crate::errors::ServiceError;
use crate::models::{LineItemRequest, ResolvedLineItem, MAX_LINE_QUANTITY, MIN_LINE_QUANTITY};
use crate::store::{price::parse_display_price, ProductStore, IN_QUERY_LIMIT};

/// Resolves requested line items to store-held prices. The only fields it
/// reads from a request are the product id and quantity; unit prices come
/// exclusively from the product store.
#[derive(Clone)]
pub struct PricingService {
    products: Arc<dyn ProductStore>,
}

impl PricingService {
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self { products }
    }

    /// Resolves each line item and returns them with the verified
    /// subtotal. Duplicate product ids are merged before validation, so a
    /// cart cannot smuggle an oversized quantity in under several lines.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn resolve(
        &self,
        items: &[LineItemRequest],
    ) -> Result<(Vec<ResolvedLineItem>, i64), ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::ValidationError(
                "cart must contain at least one item".to_string(),
            ));
        }

        // Merge duplicates, preserving first-seen order.
        let mut ordered_ids: Vec<String> = Vec::new();
        let mut quantities: HashMap<String, i64> = HashMap::new();
        for item in items {
            let product_id = item.product_id.trim();
            if product_id.is_empty() {
                return Err(ServiceError::ValidationError(
                    "line item is missing a product id".to_string(),
                ));
            }
            if item.quantity < MIN_LINE_QUANTITY {
                return Err(ServiceError::InvalidQuantity(product_id.to_string()));
            }
            let entry = quantities.entry(product_id.to_string()).or_insert_with(|| {
                ordered_ids.push(product_id.to_string());
                0
            });
            *entry += item.quantity;
        }

        for id in &ordered_ids {
            if quantities[id] > MAX_LINE_QUANTITY {
                return Err(ServiceError::InvalidQuantity(id.clone()));
            }
        }

        // Batched lookup, respecting the store's in-query key limit. Each
        // product may be addressed by its document id or its explicit id
        // field; the price map is keyed by both so either form resolves.
        let mut price_map: HashMap<String, i64> = HashMap::new();
        for chunk in ordered_ids.chunks(IN_QUERY_LIMIT) {
            for (doc_id, record) in self.products.find_by_ids(chunk).await? {
                let unit_price = parse_display_price(&record.price)?;
                price_map.insert(record.id.clone(), unit_price);
                price_map.insert(doc_id, unit_price);
            }
        }

        let mut resolved = Vec::with_capacity(ordered_ids.len());
        let mut subtotal: i64 = 0;
        for product_id in ordered_ids {
            let quantity = quantities[&product_id];
            let unit_price = *price_map
                .get(&product_id)
                .ok_or_else(|| ServiceError::ProductNotFound(product_id.clone()))?;
            let line_total = unit_price * quantity;
            subtotal += line_total;
            resolved.push(ResolvedLineItem {
                product_id,
                quantity,
                unit_price,
                line_total,
            });
        }

        Ok((resolved, subtotal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductRecord;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn record(id: &str, price: &str) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("Shirt {id}"),
            price: price.to_string(),
            category: Some("shirts".to_string()),
            description: None,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service_with(store: MemoryStore) -> PricingService {
        PricingService::new(Arc::new(store))
    }

    fn item(id: &str, quantity: i64) -> LineItemRequest {
        LineItemRequest {
            product_id: id.to_string(),
            quantity,
        }
    }

    #[tokio::test]
    async fn resolves_prices_from_the_store() {
        let store = MemoryStore::new();
        store.seed_product("sku-1", record("sku-1", "₹1,599"));

        let (items, subtotal) = service_with(store)
            .resolve(&[item("sku-1", 2)])
            .await
            .unwrap();

        assert_eq!(subtotal, 3198);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, 1599);
        assert_eq!(items[0].line_total, 3198);
    }

    #[tokio::test]
    async fn unknown_product_fails() {
        let store = MemoryStore::new();
        let err = service_with(store)
            .resolve(&[item("ghost", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ProductNotFound(id) if id == "ghost"));
    }

    #[tokio::test]
    async fn quantity_bounds_are_enforced() {
        let store = MemoryStore::new();
        store.seed_product("sku-1", record("sku-1", "₹100"));
        let svc = service_with(store);

        let err = svc.resolve(&[item("sku-1", 150)]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity(_)));

        let err = svc.resolve(&[item("sku-1", 0)]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity(_)));

        let err = svc.resolve(&[item("sku-1", -3)]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn duplicate_lines_merge_before_validation() {
        let store = MemoryStore::new();
        store.seed_product("sku-1", record("sku-1", "₹100"));
        let svc = service_with(store);

        let (items, subtotal) = svc
            .resolve(&[item("sku-1", 2), item("sku-1", 3)])
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(subtotal, 500);

        // Individually valid quantities that merge past the cap are rejected.
        let err = svc
            .resolve(&[item("sku-1", 60), item("sku-1", 60)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidQuantity(_)));
    }

    #[tokio::test]
    async fn large_carts_are_fetched_in_batches() {
        let store = MemoryStore::new();
        for i in 0..25 {
            store.seed_product(&format!("sku-{i}"), record(&format!("sku-{i}"), "₹10"));
        }
        // MemoryStore rejects any single lookup above the in-query limit,
        // so success here proves the resolver chunked correctly.
        let requests: Vec<LineItemRequest> =
            (0..25).map(|i| item(&format!("sku-{i}"), 1)).collect();

        let (items, subtotal) = service_with(store).resolve(&requests).await.unwrap();
        assert_eq!(items.len(), 25);
        assert_eq!(subtotal, 250);
    }

    #[tokio::test]
    async fn legacy_documents_resolve_by_explicit_id() {
        let store = MemoryStore::new();
        store.seed_product("doc-9f3a", record("sku-legacy", "₹2,000"));

        let (items, subtotal) = service_with(store)
            .resolve(&[item("sku-legacy", 1)])
            .await
            .unwrap();
        assert_eq!(subtotal, 2000);
        assert_eq!(items[0].product_id, "sku-legacy");
    }

    #[tokio::test]
    async fn empty_cart_is_a_validation_error() {
        let store = MemoryStore::new();
        let err = service_with(store).resolve(&[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
