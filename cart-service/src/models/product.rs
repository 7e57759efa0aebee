//! Catalog view of a product, as consumed by the cart engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The subset of a catalog product the cart needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sale_price: Decimal,
    pub stock_quantity: u32,
    pub purchase_quantity: u32,
    pub size: String,
    pub color: String,
}

impl Product {
    /// Largest quantity a single cart line may hold for this product.
    pub fn purchase_ceiling(&self) -> u32 {
        self.purchase_quantity.min(self.stock_quantity)
    }

    pub fn line_price(&self, quantity: u32) -> Decimal {
        self.sale_price * Decimal::from(quantity)
    }
}
