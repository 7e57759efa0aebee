use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{
    CartLine, DeliveryMethod, Deposit, Invoice, PaymentMethod, PaymentStatus,
};
use crate::services::{
    CartOutcome, CartSummary, DeletedInvoice, InvoiceDraft, LineDraft, NewLine, UpsertCandidate,
};

// -----------------------------------------------------------------------------
// Requests
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Full invoice body. Unknown fields (`user_id`, `total_amount`, timestamps)
/// are ignored; the server owns them.
#[derive(Debug, Deserialize, Validate)]
pub struct InvoiceRequest {
    #[serde(default, alias = "_id")]
    #[validate(length(min = 1, message = "id must not be empty"))]
    pub id: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    pub cart: Vec<CartLineRequest>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub delivery_method: Option<DeliveryMethod>,
    #[serde(default)]
    #[validate(length(max = 500, message = "delivery_address is too long"))]
    pub delivery_address: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewLineRequest {
    #[validate(length(min = 1, message = "product_id is required"))]
    pub product_id: String,
    /// Accepted for compatibility and ignored; new lines start at 1.
    pub quantity: Option<u32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Body of `POST /invoices`: either a whole invoice or a single new line.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpsertLineRequest {
    Invoice(InvoiceRequest),
    Line(NewLineRequest),
}

impl Validate for UpsertLineRequest {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            UpsertLineRequest::Invoice(invoice) => invoice.validate(),
            UpsertLineRequest::Line(line) => line.validate(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub deposit_amount: Decimal,
}

impl From<CartLineRequest> for LineDraft {
    fn from(req: CartLineRequest) -> Self {
        LineDraft {
            product_id: req.product_id,
            quantity: req.quantity,
            size: req.size,
            color: req.color,
        }
    }
}

impl From<InvoiceRequest> for InvoiceDraft {
    fn from(req: InvoiceRequest) -> Self {
        InvoiceDraft {
            id: req.id,
            version: req.version,
            cart: req.cart.into_iter().map(LineDraft::from).collect(),
            payment_status: req.payment_status,
            payment_method: req.payment_method,
            delivery_method: req.delivery_method,
            delivery_address: req.delivery_address,
        }
    }
}

impl From<NewLineRequest> for NewLine {
    fn from(req: NewLineRequest) -> Self {
        NewLine {
            product_id: req.product_id,
            quantity: req.quantity,
            size: req.size,
            color: req.color,
        }
    }
}

impl From<UpsertLineRequest> for UpsertCandidate {
    fn from(req: UpsertLineRequest) -> Self {
        match req {
            UpsertLineRequest::Invoice(invoice) => UpsertCandidate::Invoice(invoice.into()),
            UpsertLineRequest::Line(line) => UpsertCandidate::NewLine(line.into()),
        }
    }
}

// -----------------------------------------------------------------------------
// Responses
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CartLineResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            quantity: line.quantity,
            size: line.size,
            color: line.color,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepositResponse {
    pub deposit_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<Deposit> for DepositResponse {
    fn from(deposit: Deposit) -> Self {
        Self {
            deposit_amount: deposit.deposit_amount,
            created_at: deposit.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub user_id: String,
    pub cart: Vec<CartLineResponse>,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    pub deposit: Vec<DepositResponse>,
    pub delivery_method: DeliveryMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            user_id: invoice.user_id,
            cart: invoice.cart.into_iter().map(CartLineResponse::from).collect(),
            total_amount: invoice.total_amount,
            payment_status: invoice.payment_status,
            payment_method: invoice.payment_method,
            deposit: invoice.deposit.into_iter().map(DepositResponse::from).collect(),
            delivery_method: invoice.delivery_method,
            delivery_address: invoice.delivery_address,
            version: invoice.version,
            created_at: invoice.created_at,
            updated_at: invoice.updated_at,
        }
    }
}

/// Response of mutations that may delete the invoice.
#[derive(Debug, Serialize, Deserialize)]
pub struct CartMutationResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceResponse>,
    /// Set when the invoice no longer exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_invoice_id: Option<String>,
}

impl CartMutationResponse {
    /// `updated_message` is used when the invoice survived the mutation.
    pub fn from_outcome(outcome: CartOutcome, updated_message: &str) -> Self {
        match outcome {
            CartOutcome::Updated(invoice) => Self {
                message: updated_message.to_string(),
                invoice: Some(invoice.into()),
                deleted_invoice_id: None,
            },
            CartOutcome::Deleted(deleted) => deleted.into(),
        }
    }
}

impl From<DeletedInvoice> for CartMutationResponse {
    fn from(deleted: DeletedInvoice) -> Self {
        Self {
            message: deleted.reason.message().to_string(),
            invoice: None,
            deleted_invoice_id: Some(deleted.invoice_id),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CartSummaryResponse {
    pub user_id: String,
    pub item_count: u64,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl From<CartSummary> for CartSummaryResponse {
    fn from(summary: CartSummary) -> Self {
        Self {
            user_id: summary.user_id,
            item_count: summary.item_count,
            subtotal: summary.subtotal,
            tax_rate: summary.tax_rate,
            tax: summary.tax,
            total: summary.total,
        }
    }
}
