//! Invoice model for cart-service.
//!
//! An unpaid invoice doubles as the user's shopping cart.

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CartLine, LineSelector};

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    #[serde(rename = "P-on-C")]
    PayOnCollection,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "Unpaid",
            PaymentStatus::PayOnCollection => "P-on-C",
            PaymentStatus::Paid => "Paid",
        }
    }

    /// Only unpaid invoices act as a cart.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Unpaid)
    }
}

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "EFT")]
    Eft,
}

/// Delivery method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryMethod {
    #[default]
    #[serde(rename = "Own Collection")]
    OwnCollection,
    Delivery,
}

/// A deposit paid against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub deposit_amount: Decimal,
    #[serde(alias = "createdAt", with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Invoice document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "_id", with = "super::document_id")]
    pub id: String,
    pub user_id: String,
    pub cart: Vec<CartLine>,
    pub total_amount: Decimal,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub deposit: Vec<Deposit>,
    #[serde(default)]
    pub delivery_method: DeliveryMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    /// Write counter for compare-and-swap updates.
    #[serde(default)]
    pub version: i64,
    #[serde(alias = "createdAt", with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "updatedAt", with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Start a new open invoice for `user_id` holding `cart`.
    pub fn open(user_id: String, cart: Vec<CartLine>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            cart,
            total_amount: Decimal::ZERO,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            deposit: Vec::new(),
            delivery_method: DeliveryMethod::OwnCollection,
            delivery_address: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.payment_status.is_open()
    }

    pub fn contains_product(&self, product_id: &str) -> bool {
        self.cart.iter().any(|line| line.product_id == product_id)
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.cart.iter().find(|line| line.product_id == product_id)
    }

    pub fn line_mut(&mut self, product_id: &str) -> Option<&mut CartLine> {
        self.cart.iter_mut().find(|line| line.product_id == product_id)
    }

    /// Pull the line matching `selector` out of the cart.
    pub fn take_line(&mut self, selector: &LineSelector) -> Option<CartLine> {
        let index = self.cart.iter().position(|line| selector.matches(line))?;
        Some(self.cart.remove(index))
    }

    /// Overwrite the cart, keeping the existing line id for every product that
    /// was already present.
    pub fn replace_cart(&mut self, lines: Vec<CartLine>) {
        let cart = lines
            .into_iter()
            .map(|mut line| {
                if let Some(existing) = self.line(&line.product_id) {
                    line.id = existing.id.clone();
                }
                line
            })
            .collect();
        self.cart = cart;
    }

    pub fn item_count(&self) -> u64 {
        self.cart.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Bump the version and update timestamp ahead of a write.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}
