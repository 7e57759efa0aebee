//! Cart line model for cart-service.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One product's presence in an invoice cart.
///
/// `size` and `color` are snapshots taken when the line was created and are
/// not kept in sync with later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "_id", with = "super::document_id")]
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub color: String,
}

impl CartLine {
    pub fn new(product_id: String, quantity: u32, size: String, color: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            product_id,
            quantity,
            size,
            color,
        }
    }
}

/// Targets a single line of a cart, either by product or by the line's own id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineSelector {
    Product(String),
    Line(String),
}

impl LineSelector {
    pub fn matches(&self, line: &CartLine) -> bool {
        match self {
            LineSelector::Product(product_id) => line.product_id == *product_id,
            LineSelector::Line(line_id) => line.id == *line_id,
        }
    }
}

impl fmt::Display for LineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSelector::Product(id) => write!(f, "product {}", id),
            LineSelector::Line(id) => write!(f, "cart line {}", id),
        }
    }
}
