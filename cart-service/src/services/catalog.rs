//! Read-only product catalog used for stock ceilings, prices and snapshots.

use crate::error::CartError;
use crate::models::Product;
use crate::services::database::{MongoDb, PRODUCTS_COLLECTION};
use crate::services::metrics::STORE_QUERY_DURATION;
use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::Collection;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_id(&self, product_id: &str) -> Result<Option<Product>, CartError>;
}

/// Product document as stored by the catalog service.
#[derive(Debug, Deserialize)]
struct ProductDocument {
    #[serde(rename = "_id")]
    id: Bson,
    #[serde(default)]
    appearance: Appearance,
    pricing: Pricing,
}

#[derive(Debug, Default, Deserialize)]
struct Appearance {
    #[serde(default)]
    color: String,
    #[serde(default)]
    size: String,
}

// Catalog numbers may be stored as int32, int64 or double.
#[derive(Debug, Deserialize)]
struct Pricing {
    sale_price: f64,
    #[serde(default)]
    purchase_quantity: f64,
    #[serde(default)]
    stock_quantity: f64,
}

fn quantity(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

impl TryFrom<ProductDocument> for Product {
    type Error = CartError;

    fn try_from(doc: ProductDocument) -> Result<Self, Self::Error> {
        let id = match doc.id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(s) => s,
            other => other.to_string(),
        };
        let sale_price = Decimal::from_f64(doc.pricing.sale_price).ok_or_else(|| {
            CartError::Unexpected(anyhow::anyhow!(
                "product {} has an unusable sale price {}",
                id,
                doc.pricing.sale_price
            ))
        })?;
        Ok(Product {
            sale_price,
            stock_quantity: quantity(doc.pricing.stock_quantity),
            purchase_quantity: quantity(doc.pricing.purchase_quantity),
            size: doc.appearance.size,
            color: doc.appearance.color,
            id,
        })
    }
}

#[derive(Clone)]
pub struct MongoProductCatalog {
    products: Collection<ProductDocument>,
}

impl MongoProductCatalog {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            products: db.collection(PRODUCTS_COLLECTION),
        }
    }
}

#[async_trait]
impl ProductCatalog for MongoProductCatalog {
    async fn find_by_id(&self, product_id: &str) -> Result<Option<Product>, CartError> {
        let timer = STORE_QUERY_DURATION
            .with_label_values(&["product_lookup"])
            .start_timer();
        let filter = match ObjectId::parse_str(product_id) {
            Ok(oid) => doc! { "_id": oid },
            Err(_) => doc! { "_id": product_id },
        };
        let found = self.products.find_one(filter, None).await?;
        timer.observe_duration();
        found.map(Product::try_from).transpose()
    }
}

/// Catalog held in memory; used by the memory backend and tests.
#[derive(Clone, Default)]
pub struct InMemoryProductCatalog {
    products: Arc<DashMap<String, Product>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn remove(&self, product_id: &str) -> Option<Product> {
        self.products.remove(product_id).map(|(_, product)| product)
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_id(&self, product_id: &str) -> Result<Option<Product>, CartError> {
        Ok(self.products.get(product_id).map(|entry| entry.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_document_maps_nested_fields() {
        let oid = ObjectId::new();
        let doc = ProductDocument {
            id: Bson::ObjectId(oid),
            appearance: Appearance {
                color: "navy".into(),
                size: "XL".into(),
            },
            pricing: Pricing {
                sale_price: 199.99,
                purchase_quantity: 3.0,
                stock_quantity: -2.0,
            },
        };

        let product = Product::try_from(doc).unwrap();
        assert_eq!(product.id, oid.to_hex());
        assert_eq!(product.sale_price, Decimal::new(19999, 2));
        assert_eq!(product.purchase_quantity, 3);
        assert_eq!(product.stock_quantity, 0);
        assert_eq!(product.size, "XL");
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let doc = ProductDocument {
            id: Bson::String("p1".into()),
            appearance: Appearance::default(),
            pricing: Pricing {
                sale_price: f64::NAN,
                purchase_quantity: 1.0,
                stock_quantity: 1.0,
            },
        };
        assert!(matches!(
            Product::try_from(doc),
            Err(CartError::Unexpected(_))
        ));
    }
}
