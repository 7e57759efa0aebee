pub mod catalog;
pub mod database;
pub mod invoice_store;
pub mod metrics;
pub mod repository;
pub mod stock_policy;

pub use catalog::{InMemoryProductCatalog, MongoProductCatalog, ProductCatalog};
pub use database::MongoDb;
pub use invoice_store::{
    CartOutcome, CartSummary, DeletedInvoice, DeletionReason, InvoiceDraft, InvoiceStore,
    LineDraft, NewLine, UpsertCandidate,
};
pub use repository::{
    InMemoryInvoiceRepository, InvoiceFilter, InvoiceRepository, MongoInvoiceRepository,
};
