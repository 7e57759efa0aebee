//! Invoice store: the cart engine.
//!
//! Every mutation follows the same shape: load the invoice, apply the change
//! in memory, consult the stock policy, reprice, then write it back with a
//! version check. An invoice whose cart would become empty is deleted instead
//! of saved.

use crate::error::CartError;
use crate::models::{
    CartLine, DeliveryMethod, Deposit, Invoice, LineSelector, PaymentMethod, PaymentStatus,
    Product,
};
use crate::services::catalog::ProductCatalog;
use crate::services::metrics::{record_operation, INVOICES_DELETED_TOTAL, POLICY_REJECTIONS_TOTAL};
use crate::services::repository::{InvoiceFilter, InvoiceRepository};
use crate::services::stock_policy;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Desired state of an invoice, submitted as a whole.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    pub id: Option<String>,
    /// Version the caller last read. Defaults to the stored version.
    pub version: Option<i64>,
    pub cart: Vec<LineDraft>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub delivery_method: Option<DeliveryMethod>,
    pub delivery_address: Option<String>,
}

/// One line of an [`InvoiceDraft`].
#[derive(Debug, Clone, Default)]
pub struct LineDraft {
    pub product_id: String,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A single product to put in the user's cart.
#[derive(Debug, Clone, Default)]
pub struct NewLine {
    pub product_id: String,
    /// Ignored: new lines always start at the policy's initial quantity.
    pub quantity: Option<u32>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Input to [`InvoiceStore::upsert_line`].
#[derive(Debug, Clone)]
pub enum UpsertCandidate {
    Invoice(InvoiceDraft),
    NewLine(NewLine),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionReason {
    /// The removed line was the only one.
    LastLineRemoved,
    /// Pulling the line left the cart empty.
    CartEmptied,
    /// Whole-invoice delete.
    Requested,
}

impl DeletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionReason::LastLineRemoved => "last_line_removed",
            DeletionReason::CartEmptied => "cart_emptied",
            DeletionReason::Requested => "requested",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DeletionReason::LastLineRemoved => "Invoice deleted successfully (cart was last item)",
            DeletionReason::CartEmptied => "Invoice deleted successfully (cart is now empty)",
            DeletionReason::Requested => "Invoice deleted successfully",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletedInvoice {
    pub invoice_id: String,
    pub reason: DeletionReason,
}

/// Result of a mutation that may delete the invoice.
#[derive(Debug, Clone)]
pub enum CartOutcome {
    Updated(Invoice),
    Deleted(DeletedInvoice),
}

impl CartOutcome {
    pub fn invoice(&self) -> Option<&Invoice> {
        match self {
            CartOutcome::Updated(invoice) => Some(invoice),
            CartOutcome::Deleted(_) => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, CartOutcome::Deleted(_))
    }
}

/// Totals over a user's open invoices. Tax is for display only.
#[derive(Debug, Clone, PartialEq)]
pub struct CartSummary {
    pub user_id: String,
    pub item_count: u64,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

fn finish<T>(operation: &str, result: Result<T, CartError>) -> Result<T, CartError> {
    match &result {
        Ok(_) => record_operation(operation, "ok"),
        Err(err) => {
            record_operation(operation, err.kind());
            match err {
                CartError::Persistence(_) | CartError::Unexpected(_) => {}
                _ => debug!(operation, error = %err, "Cart operation refused"),
            }
        }
    }
    result
}

fn policy_rejection(policy: &str, message: String) -> CartError {
    POLICY_REJECTIONS_TOTAL.with_label_values(&[policy]).inc();
    warn!(policy, "{}", message);
    CartError::Validation(message)
}

/// Cart-scoped writes only apply to unpaid invoices.
fn require_open(invoice: &Invoice) -> Result<(), CartError> {
    if invoice.is_open() {
        return Ok(());
    }
    Err(CartError::conflict(format!(
        "Invoice {} is {} and its cart can no longer change",
        invoice.id,
        invoice.payment_status.as_str()
    )))
}

fn require_user(user_id: &str) -> Result<(), CartError> {
    if user_id.trim().is_empty() {
        return Err(CartError::validation("user id is required"));
    }
    Ok(())
}

/// Where a submitted whole-invoice body lands.
enum DraftTarget {
    /// Named by id, or shares a product with the body: cart is replaced.
    Overwrite(Invoice),
    /// The user's open invoice, sharing nothing with the body: lines are added.
    Append(Invoice),
    Create,
}

#[derive(Clone)]
pub struct InvoiceStore {
    repository: Arc<dyn InvoiceRepository>,
    catalog: Arc<dyn ProductCatalog>,
    display_tax_rate: Decimal,
}

impl InvoiceStore {
    pub fn new(
        repository: Arc<dyn InvoiceRepository>,
        catalog: Arc<dyn ProductCatalog>,
        display_tax_rate: Decimal,
    ) -> Self {
        Self {
            repository,
            catalog,
            display_tax_rate,
        }
    }

    pub async fn health_check(&self) -> Result<(), CartError> {
        self.repository.health_check().await
    }

    /// All invoices, newest first.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Invoice>, CartError> {
        let result = self.repository.list(&InvoiceFilter::default()).await;
        finish("list_all", result)
    }

    /// Every invoice of `user_id`, whatever its payment status, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Invoice>, CartError> {
        let result = match require_user(user_id) {
            Ok(()) => self.repository.list(&InvoiceFilter::for_user(user_id)).await,
            Err(e) => Err(e),
        };
        finish("list_for_user", result)
    }

    /// Add to cart. Merges into the user's open invoice or creates one.
    #[instrument(skip(self, candidate))]
    pub async fn upsert_line(
        &self,
        user_id: &str,
        candidate: UpsertCandidate,
    ) -> Result<Invoice, CartError> {
        let result = match require_user(user_id) {
            Err(e) => Err(e),
            Ok(()) => match candidate {
                UpsertCandidate::Invoice(draft) => self.merge_draft(user_id, draft).await,
                UpsertCandidate::NewLine(line) => self.add_line(user_id, line).await,
            },
        };
        finish("upsert_line", result)
    }

    /// Overwrite an existing invoice with `draft`.
    #[instrument(skip(self, draft))]
    pub async fn update_invoice(
        &self,
        invoice_id: &str,
        draft: InvoiceDraft,
    ) -> Result<Invoice, CartError> {
        let result = self.overwrite(invoice_id, draft).await;
        finish("update_invoice", result)
    }

    #[instrument(skip(self))]
    pub async fn increment_line(
        &self,
        invoice_id: &str,
        product_id: &str,
    ) -> Result<Invoice, CartError> {
        let result = self.step_up(invoice_id, product_id).await;
        finish("increment_line", result)
    }

    /// Quantity minus one; at quantity 1 the line is removed instead.
    #[instrument(skip(self))]
    pub async fn decrement_line(
        &self,
        invoice_id: &str,
        product_id: &str,
    ) -> Result<CartOutcome, CartError> {
        let result = self.step_down(invoice_id, product_id).await;
        finish("decrement_line", result)
    }

    /// Remove one line, deleting the invoice when the cart empties.
    #[instrument(skip(self, selector), fields(selector = %selector))]
    pub async fn remove_line(
        &self,
        invoice_id: &str,
        selector: LineSelector,
    ) -> Result<CartOutcome, CartError> {
        let result = match self.require(invoice_id).await {
            Ok(invoice) => match require_open(&invoice) {
                Ok(()) => self.remove_from(invoice, &selector).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };
        finish("remove_line", result)
    }

    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, invoice_id: &str) -> Result<DeletedInvoice, CartError> {
        let result = match self.repository.delete(invoice_id, None).await {
            Ok(true) => {
                INVOICES_DELETED_TOTAL
                    .with_label_values(&[DeletionReason::Requested.as_str()])
                    .inc();
                info!(invoice_id, "Invoice deleted");
                Ok(DeletedInvoice {
                    invoice_id: invoice_id.to_string(),
                    reason: DeletionReason::Requested,
                })
            }
            Ok(false) => Err(CartError::not_found("Invoice not found")),
            Err(e) => Err(e),
        };
        finish("delete_invoice", result)
    }

    #[instrument(skip(self))]
    pub async fn record_deposit(
        &self,
        invoice_id: &str,
        amount: Decimal,
    ) -> Result<Invoice, CartError> {
        let result = self.push_deposit(invoice_id, amount).await;
        finish("record_deposit", result)
    }

    #[instrument(skip(self))]
    pub async fn cart_summary(&self, user_id: &str) -> Result<CartSummary, CartError> {
        let result = match require_user(user_id) {
            Ok(()) => self.summarize(user_id).await,
            Err(e) => Err(e),
        };
        finish("cart_summary", result)
    }

    // -------------------------------------------------------------------------
    // upsert
    // -------------------------------------------------------------------------

    async fn add_line(&self, user_id: &str, new_line: NewLine) -> Result<Invoice, CartError> {
        if new_line.product_id.trim().is_empty() {
            return Err(CartError::validation("product_id is required"));
        }
        let product = self.product(&new_line.product_id).await?;
        let ceiling = product.purchase_ceiling();

        if let Some(requested) = new_line
            .quantity
            .filter(|q| *q != stock_policy::INITIAL_LINE_QUANTITY)
        {
            debug!(requested, "Requested quantity ignored for a new cart line");
        }

        let target = self
            .find_target(user_id, &[new_line.product_id.as_str()])
            .await?;

        match target {
            Some(mut invoice) => {
                let expected = invoice.version;
                match invoice.line_mut(&new_line.product_id) {
                    Some(line) => {
                        if !stock_policy::can_increment(line.quantity, ceiling) {
                            return Err(policy_rejection(
                                "increment",
                                format!(
                                    "Cannot add more of product {}: purchase limit of {} reached",
                                    new_line.product_id, ceiling
                                ),
                            ));
                        }
                        line.quantity += 1;
                    }
                    None => {
                        let line = Self::start_line(new_line, &product)?;
                        invoice.cart.push(line);
                    }
                }
                self.save(invoice, expected).await
            }
            None => {
                let line = Self::start_line(new_line, &product)?;
                let invoice = Invoice::open(user_id.to_string(), vec![line]);
                self.create(invoice).await
            }
        }
    }

    fn start_line(new_line: NewLine, product: &Product) -> Result<CartLine, CartError> {
        let mut line = CartLine::new(
            new_line.product_id,
            0,
            new_line.size.unwrap_or_else(|| product.size.clone()),
            new_line.color.unwrap_or_else(|| product.color.clone()),
        );
        let initial = stock_policy::initial_quantity_for(&line);
        if !stock_policy::within_ceiling(initial, product.purchase_ceiling()) {
            return Err(policy_rejection(
                "initial",
                format!("Product {} is out of stock", line.product_id),
            ));
        }
        line.quantity = initial;
        Ok(line)
    }

    async fn merge_draft(&self, user_id: &str, mut draft: InvoiceDraft) -> Result<Invoice, CartError> {
        let target = match draft.id.as_deref() {
            Some(invoice_id) => {
                let invoice = self.require(invoice_id).await?;
                if invoice.user_id != user_id {
                    // Someone else's invoice id is indistinguishable from a missing one
                    return Err(CartError::not_found("Invoice not found"));
                }
                require_open(&invoice)?;
                DraftTarget::Overwrite(invoice)
            }
            None => {
                let product_ids: Vec<&str> =
                    draft.cart.iter().map(|line| line.product_id.as_str()).collect();
                match self.find_target(user_id, &product_ids).await? {
                    Some(invoice)
                        if product_ids.iter().any(|id| invoice.contains_product(id)) =>
                    {
                        DraftTarget::Overwrite(invoice)
                    }
                    Some(invoice) => DraftTarget::Append(invoice),
                    None => DraftTarget::Create,
                }
            }
        };

        let lines = std::mem::take(&mut draft.cart);
        match target {
            DraftTarget::Overwrite(invoice) => self.apply_draft(invoice, lines, draft).await,
            DraftTarget::Append(invoice) => self.append_lines(invoice, lines).await,
            DraftTarget::Create => {
                let cart = self.normalize(lines, None).await?;
                let mut invoice = Invoice::open(user_id.to_string(), cart);
                Self::apply_fields(&mut invoice, draft);
                self.create(invoice).await
            }
        }
    }

    /// Add the submitted lines to an open invoice that shares no product with
    /// them. Existing lines and invoice fields are left as they are.
    async fn append_lines(
        &self,
        mut invoice: Invoice,
        lines: Vec<LineDraft>,
    ) -> Result<Invoice, CartError> {
        let expected = invoice.version;
        let additions = self.normalize(lines, Some(&invoice)).await?;
        for line in additions {
            if !invoice.contains_product(&line.product_id) {
                invoice.cart.push(line);
            }
        }
        debug!(invoice_id = %invoice.id, lines = invoice.cart.len(), "Appended submitted cart");
        self.save(invoice, expected).await
    }

    async fn overwrite(&self, invoice_id: &str, mut draft: InvoiceDraft) -> Result<Invoice, CartError> {
        if let Some(body_id) = draft.id.as_deref() {
            if body_id != invoice_id {
                return Err(CartError::validation(format!(
                    "Invoice id {} in body does not match {}",
                    body_id, invoice_id
                )));
            }
        }
        let invoice = self.require(invoice_id).await?;
        let lines = std::mem::take(&mut draft.cart);
        self.apply_draft(invoice, lines, draft).await
    }

    async fn apply_draft(
        &self,
        mut invoice: Invoice,
        lines: Vec<LineDraft>,
        draft: InvoiceDraft,
    ) -> Result<Invoice, CartError> {
        let expected = draft.version.unwrap_or(invoice.version);
        if expected != invoice.version {
            return Err(Self::stale(&invoice.id));
        }
        let cart = self.normalize(lines, Some(&invoice)).await?;
        invoice.replace_cart(cart);
        Self::apply_fields(&mut invoice, draft);
        self.save(invoice, expected).await
    }

    fn apply_fields(invoice: &mut Invoice, draft: InvoiceDraft) {
        if let Some(status) = draft.payment_status {
            invoice.payment_status = status;
        }
        if let Some(method) = draft.payment_method {
            invoice.payment_method = Some(method);
        }
        if let Some(delivery) = draft.delivery_method {
            invoice.delivery_method = delivery;
        }
        if let Some(address) = draft.delivery_address {
            invoice.delivery_address = Some(address);
        }
    }

    /// Validate a submitted cart and resolve its snapshots.
    ///
    /// Zero-quantity lines are dropped. Size and colour come from the draft,
    /// then the existing line, then the catalog.
    async fn normalize(
        &self,
        lines: Vec<LineDraft>,
        existing: Option<&Invoice>,
    ) -> Result<Vec<CartLine>, CartError> {
        let mut seen = HashSet::new();
        let mut cart = Vec::with_capacity(lines.len());

        for draft in lines {
            if draft.product_id.trim().is_empty() {
                return Err(CartError::validation("cart line is missing product_id"));
            }
            if !seen.insert(draft.product_id.clone()) {
                return Err(CartError::validation(format!(
                    "Product {} appears more than once in the cart",
                    draft.product_id
                )));
            }
            if draft.quantity == 0 {
                continue;
            }

            let product = self.product(&draft.product_id).await?;
            let ceiling = product.purchase_ceiling();
            if !stock_policy::within_ceiling(draft.quantity, ceiling) {
                return Err(policy_rejection(
                    "ceiling",
                    format!(
                        "Quantity {} for product {} exceeds the purchase limit of {}",
                        draft.quantity, draft.product_id, ceiling
                    ),
                ));
            }

            let previous = existing.and_then(|invoice| invoice.line(&draft.product_id));
            let size = draft
                .size
                .or_else(|| previous.map(|line| line.size.clone()))
                .unwrap_or(product.size);
            let color = draft
                .color
                .or_else(|| previous.map(|line| line.color.clone()))
                .unwrap_or(product.color);
            cart.push(CartLine::new(draft.product_id, draft.quantity, size, color));
        }

        if cart.is_empty() {
            return Err(CartError::validation(
                "Cart must contain at least one item with a positive quantity",
            ));
        }
        Ok(cart)
    }

    /// The user's open invoice to merge into: the newest one referencing any
    /// of `product_ids`, else the newest open invoice.
    async fn find_target(
        &self,
        user_id: &str,
        product_ids: &[&str],
    ) -> Result<Option<Invoice>, CartError> {
        let mut open = self
            .repository
            .list(&InvoiceFilter::open_for_user(user_id))
            .await?;
        if open.len() > 1 {
            warn!(user_id, count = open.len(), "User has more than one open invoice");
        }
        if open.is_empty() {
            return Ok(None);
        }
        let position = open
            .iter()
            .position(|invoice| product_ids.iter().any(|id| invoice.contains_product(id)))
            .unwrap_or(0);
        Ok(Some(open.swap_remove(position)))
    }

    // -------------------------------------------------------------------------
    // quantities
    // -------------------------------------------------------------------------

    async fn step_up(&self, invoice_id: &str, product_id: &str) -> Result<Invoice, CartError> {
        let mut invoice = self.require(invoice_id).await?;
        require_open(&invoice)?;
        let expected = invoice.version;
        let current = Self::quantity_of(&invoice, product_id)?;
        let ceiling = self.product(product_id).await?.purchase_ceiling();

        if !stock_policy::can_increment(current, ceiling) {
            return Err(policy_rejection(
                "increment",
                format!(
                    "Cannot add more of product {}: purchase limit of {} reached",
                    product_id, ceiling
                ),
            ));
        }
        if let Some(line) = invoice.line_mut(product_id) {
            line.quantity += 1;
        }
        self.save(invoice, expected).await
    }

    async fn step_down(&self, invoice_id: &str, product_id: &str) -> Result<CartOutcome, CartError> {
        let mut invoice = self.require(invoice_id).await?;
        require_open(&invoice)?;
        let expected = invoice.version;
        let current = Self::quantity_of(&invoice, product_id)?;

        if !stock_policy::can_decrement(current) {
            return Err(policy_rejection(
                "decrement",
                format!("Quantity of product {} cannot go lower", product_id),
            ));
        }
        if current == 1 {
            return self
                .remove_from(invoice, &LineSelector::Product(product_id.to_string()))
                .await;
        }
        if let Some(line) = invoice.line_mut(product_id) {
            line.quantity -= 1;
        }
        self.save(invoice, expected).await.map(CartOutcome::Updated)
    }

    fn quantity_of(invoice: &Invoice, product_id: &str) -> Result<u32, CartError> {
        invoice
            .line(product_id)
            .map(|line| line.quantity)
            .ok_or_else(|| CartError::not_found(format!("Product {} is not in the cart", product_id)))
    }

    // -------------------------------------------------------------------------
    // removal
    // -------------------------------------------------------------------------

    async fn remove_from(
        &self,
        mut invoice: Invoice,
        selector: &LineSelector,
    ) -> Result<CartOutcome, CartError> {
        if invoice.cart.is_empty() {
            return Err(CartError::not_found("Cart is already empty"));
        }

        if invoice.cart.len() == 1 {
            if !invoice.cart.iter().any(|line| selector.matches(line)) {
                return Err(CartError::validation(format!(
                    "{} is not the last item of invoice {}",
                    selector, invoice.id
                )));
            }
            return self.destroy(&invoice, DeletionReason::LastLineRemoved).await;
        }

        let expected = invoice.version;
        if invoice.take_line(selector).is_none() {
            return Err(CartError::not_found(format!("{} not found in cart", selector)));
        }
        if invoice.cart.is_empty() {
            return self.destroy(&invoice, DeletionReason::CartEmptied).await;
        }
        self.save(invoice, expected).await.map(CartOutcome::Updated)
    }

    async fn destroy(
        &self,
        invoice: &Invoice,
        reason: DeletionReason,
    ) -> Result<CartOutcome, CartError> {
        if !self
            .repository
            .delete(&invoice.id, Some(invoice.version))
            .await?
        {
            return Err(self.write_miss(&invoice.id).await);
        }
        INVOICES_DELETED_TOTAL
            .with_label_values(&[reason.as_str()])
            .inc();
        info!(invoice_id = %invoice.id, reason = reason.as_str(), "Invoice deleted");
        Ok(CartOutcome::Deleted(DeletedInvoice {
            invoice_id: invoice.id.clone(),
            reason,
        }))
    }

    // -------------------------------------------------------------------------
    // deposits and summary
    // -------------------------------------------------------------------------

    async fn push_deposit(&self, invoice_id: &str, amount: Decimal) -> Result<Invoice, CartError> {
        if amount <= Decimal::ZERO {
            return Err(CartError::validation("Deposit amount must be positive"));
        }
        let deposit = Deposit {
            deposit_amount: amount,
            created_at: Utc::now(),
        };
        let invoice = self
            .repository
            .push_deposit(invoice_id, &deposit)
            .await?
            .ok_or_else(|| CartError::not_found("Invoice not found"))?;
        info!(invoice_id, %amount, "Deposit recorded");
        Ok(invoice)
    }

    async fn summarize(&self, user_id: &str) -> Result<CartSummary, CartError> {
        let open = self
            .repository
            .list(&InvoiceFilter::open_for_user(user_id))
            .await?;

        let mut item_count = 0u64;
        let mut subtotal = Decimal::ZERO;
        for invoice in &open {
            item_count += invoice.item_count();
            subtotal += self.cart_value(invoice).await?;
        }

        let subtotal = subtotal.round_dp(2);
        let tax = (subtotal * self.display_tax_rate).round_dp(2);
        Ok(CartSummary {
            user_id: user_id.to_string(),
            item_count,
            subtotal,
            tax_rate: self.display_tax_rate,
            tax,
            total: subtotal + tax,
        })
    }

    // -------------------------------------------------------------------------
    // helpers
    // -------------------------------------------------------------------------

    async fn require(&self, invoice_id: &str) -> Result<Invoice, CartError> {
        self.repository
            .get(invoice_id)
            .await?
            .ok_or_else(|| CartError::not_found("Invoice not found"))
    }

    async fn product(&self, product_id: &str) -> Result<Product, CartError> {
        self.catalog
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| CartError::not_found(format!("Product {} not found", product_id)))
    }

    /// Σ sale price × quantity. Products missing from the catalog count as 0.
    async fn cart_value(&self, invoice: &Invoice) -> Result<Decimal, CartError> {
        let mut total = Decimal::ZERO;
        for line in &invoice.cart {
            match self.catalog.find_by_id(&line.product_id).await? {
                Some(product) => total += product.line_price(line.quantity),
                None => warn!(
                    invoice_id = %invoice.id,
                    product_id = %line.product_id,
                    "Cart line references a product missing from the catalog"
                ),
            }
        }
        Ok(total)
    }

    async fn create(&self, mut invoice: Invoice) -> Result<Invoice, CartError> {
        invoice.total_amount = self.cart_value(&invoice).await?;
        self.repository.insert(&invoice).await?;
        info!(invoice_id = %invoice.id, user_id = %invoice.user_id, "Invoice created");
        Ok(invoice)
    }

    async fn save(&self, mut invoice: Invoice, expected_version: i64) -> Result<Invoice, CartError> {
        invoice.total_amount = self.cart_value(&invoice).await?;
        invoice.touch();
        if self.repository.replace(&invoice, expected_version).await? {
            debug!(invoice_id = %invoice.id, version = invoice.version, "Invoice saved");
            Ok(invoice)
        } else {
            Err(self.write_miss(&invoice.id).await)
        }
    }

    /// Explain a version-checked write that matched nothing.
    async fn write_miss(&self, invoice_id: &str) -> CartError {
        match self.repository.get(invoice_id).await {
            Ok(Some(_)) => Self::stale(invoice_id),
            Ok(None) => CartError::not_found("Invoice not found"),
            Err(e) => e,
        }
    }

    fn stale(invoice_id: &str) -> CartError {
        CartError::conflict(format!(
            "Invoice {} was modified concurrently; reload and retry",
            invoice_id
        ))
    }
}
