//! Invoice persistence.
//!
//! Every write is keyed by invoice id and, for cart changes, guarded by the
//! invoice `version` so that a stale read-modify-write is refused instead of
//! silently overwriting a newer cart.

use crate::error::CartError;
use crate::models::document_id::id_bson;
use crate::models::{Deposit, Invoice, PaymentStatus};
use crate::services::database::MongoDb;
use crate::services::metrics::STORE_QUERY_DURATION;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{bson::doc, Collection};
use std::sync::Arc;

const DUPLICATE_KEY: i32 = 11000;

/// Filter for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct InvoiceFilter {
    pub user_id: Option<String>,
    /// Restrict to unpaid invoices.
    pub open_only: bool,
}

impl InvoiceFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            open_only: false,
        }
    }

    pub fn open_for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            open_only: true,
        }
    }

    fn matches(&self, invoice: &Invoice) -> bool {
        self.user_id
            .as_deref()
            .map_or(true, |user_id| invoice.user_id == user_id)
            && (!self.open_only || invoice.is_open())
    }
}

/// Document store holding invoices.
///
/// Single-document writes are atomic; nothing here spans documents.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Invoices matching `filter`, newest-created first.
    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, CartError>;

    async fn get(&self, invoice_id: &str) -> Result<Option<Invoice>, CartError>;

    /// Insert a new invoice. Fails with `Conflict` when the user already has
    /// an unpaid invoice.
    async fn insert(&self, invoice: &Invoice) -> Result<(), CartError>;

    /// Replace the stored invoice if its version still equals
    /// `expected_version`. Returns false when no such document exists.
    async fn replace(&self, invoice: &Invoice, expected_version: i64) -> Result<bool, CartError>;

    /// Delete an invoice, optionally only at `expected_version`.
    async fn delete(
        &self,
        invoice_id: &str,
        expected_version: Option<i64>,
    ) -> Result<bool, CartError>;

    /// Append a deposit and bump the version in one write.
    async fn push_deposit(
        &self,
        invoice_id: &str,
        deposit: &Deposit,
    ) -> Result<Option<Invoice>, CartError>;

    async fn health_check(&self) -> Result<(), CartError> {
        Ok(())
    }
}

fn open_invoice_conflict(user_id: &str) -> CartError {
    CartError::conflict(format!("User {} already has an open cart invoice", user_id))
}

// -----------------------------------------------------------------------------
// MongoDB
// -----------------------------------------------------------------------------

#[derive(Clone)]
pub struct MongoInvoiceRepository {
    db: MongoDb,
    invoices: Collection<Invoice>,
}

impl MongoInvoiceRepository {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            db: db.clone(),
            invoices: db.invoices(),
        }
    }

    fn map_write_error(err: mongodb::error::Error, user_id: &str) -> CartError {
        if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
            if write_error.code == DUPLICATE_KEY {
                return open_invoice_conflict(user_id);
            }
        }
        CartError::from(err)
    }
}

#[async_trait]
impl InvoiceRepository for MongoInvoiceRepository {
    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, CartError> {
        let timer = STORE_QUERY_DURATION.with_label_values(&["list"]).start_timer();

        let mut query = doc! {};
        if let Some(user_id) = &filter.user_id {
            query.insert("user_id", user_id.as_str());
        }
        if filter.open_only {
            query.insert("payment_status", PaymentStatus::Unpaid.as_str());
        }

        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1, "_id": -1 })
            .build();

        let cursor = self.invoices.find(query, options).await?;
        let mut invoices: Vec<Invoice> = cursor.try_collect().await?;
        // Older documents keep their timestamp under `createdAt`, which the
        // server-side sort does not see.
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        timer.observe_duration();
        Ok(invoices)
    }

    async fn get(&self, invoice_id: &str) -> Result<Option<Invoice>, CartError> {
        let timer = STORE_QUERY_DURATION.with_label_values(&["get"]).start_timer();
        let invoice = self
            .invoices
            .find_one(doc! { "_id": id_bson(invoice_id) }, None)
            .await?;
        timer.observe_duration();
        Ok(invoice)
    }

    async fn insert(&self, invoice: &Invoice) -> Result<(), CartError> {
        let timer = STORE_QUERY_DURATION
            .with_label_values(&["insert"])
            .start_timer();
        self.invoices
            .insert_one(invoice, None)
            .await
            .map_err(|e| Self::map_write_error(e, &invoice.user_id))?;
        timer.observe_duration();
        Ok(())
    }

    async fn replace(&self, invoice: &Invoice, expected_version: i64) -> Result<bool, CartError> {
        let timer = STORE_QUERY_DURATION
            .with_label_values(&["replace"])
            .start_timer();
        let filter = doc! { "_id": id_bson(&invoice.id), "version": expected_version };
        let result = self
            .invoices
            .replace_one(filter, invoice, None)
            .await
            .map_err(|e| Self::map_write_error(e, &invoice.user_id))?;
        timer.observe_duration();
        Ok(result.matched_count > 0)
    }

    async fn delete(
        &self,
        invoice_id: &str,
        expected_version: Option<i64>,
    ) -> Result<bool, CartError> {
        let timer = STORE_QUERY_DURATION
            .with_label_values(&["delete"])
            .start_timer();
        let mut filter = doc! { "_id": id_bson(invoice_id) };
        if let Some(version) = expected_version {
            filter.insert("version", version);
        }
        let result = self.invoices.delete_one(filter, None).await?;
        timer.observe_duration();
        Ok(result.deleted_count > 0)
    }

    async fn push_deposit(
        &self,
        invoice_id: &str,
        deposit: &Deposit,
    ) -> Result<Option<Invoice>, CartError> {
        let timer = STORE_QUERY_DURATION
            .with_label_values(&["push_deposit"])
            .start_timer();
        let update = doc! {
            "$push": { "deposit": mongodb::bson::to_bson(deposit)? },
            "$inc": { "version": 1_i64 },
            "$set": { "updated_at": mongodb::bson::DateTime::now() },
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let invoice = self
            .invoices
            .find_one_and_update(doc! { "_id": id_bson(invoice_id) }, update, options)
            .await?;
        timer.observe_duration();
        Ok(invoice)
    }

    async fn health_check(&self) -> Result<(), CartError> {
        self.db
            .health_check()
            .await
            .map_err(|e| CartError::Persistence(anyhow::anyhow!(e.to_string())))
    }
}

// -----------------------------------------------------------------------------
// In-memory
// -----------------------------------------------------------------------------

/// Process-local repository backed by `DashMap`.
///
/// `open_by_user` plays the role of the unique open-cart index. Lock order is
/// always `invoices` before `open_by_user`.
#[derive(Clone, Default)]
pub struct InMemoryInvoiceRepository {
    invoices: Arc<DashMap<String, Invoice>>,
    open_by_user: Arc<DashMap<String, String>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }

    fn claim_open_slot(&self, user_id: &str, invoice_id: &str) -> Result<(), CartError> {
        match self.open_by_user.entry(user_id.to_string()) {
            Entry::Occupied(entry) if entry.get() != invoice_id => {
                Err(open_invoice_conflict(user_id))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(invoice_id.to_string());
                Ok(())
            }
        }
    }

    fn release_open_slot(&self, user_id: &str, invoice_id: &str) {
        self.open_by_user
            .remove_if(user_id, |_, owner| owner == invoice_id);
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, CartError> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        invoices.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(invoices)
    }

    async fn get(&self, invoice_id: &str) -> Result<Option<Invoice>, CartError> {
        Ok(self.invoices.get(invoice_id).map(|entry| entry.clone()))
    }

    async fn insert(&self, invoice: &Invoice) -> Result<(), CartError> {
        if self.invoices.contains_key(&invoice.id) {
            return Err(CartError::conflict(format!(
                "Invoice {} already exists",
                invoice.id
            )));
        }
        if invoice.is_open() {
            self.claim_open_slot(&invoice.user_id, &invoice.id)?;
        }
        self.invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn replace(&self, invoice: &Invoice, expected_version: i64) -> Result<bool, CartError> {
        let Some(mut stored) = self.invoices.get_mut(&invoice.id) else {
            return Ok(false);
        };
        if stored.version != expected_version {
            return Ok(false);
        }
        match (stored.is_open(), invoice.is_open()) {
            (false, true) => self.claim_open_slot(&invoice.user_id, &invoice.id)?,
            (true, false) => self.release_open_slot(&stored.user_id, &stored.id),
            _ => {}
        }
        *stored = invoice.clone();
        Ok(true)
    }

    async fn delete(
        &self,
        invoice_id: &str,
        expected_version: Option<i64>,
    ) -> Result<bool, CartError> {
        let removed = self.invoices.remove_if(invoice_id, |_, stored| {
            expected_version.map_or(true, |version| stored.version == version)
        });
        match removed {
            Some((_, invoice)) => {
                self.release_open_slot(&invoice.user_id, &invoice.id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn push_deposit(
        &self,
        invoice_id: &str,
        deposit: &Deposit,
    ) -> Result<Option<Invoice>, CartError> {
        let Some(mut stored) = self.invoices.get_mut(invoice_id) else {
            return Ok(None);
        };
        stored.deposit.push(deposit.clone());
        stored.touch();
        Ok(Some(stored.clone()))
    }
}
