//! Domain models for cart-service.

mod cart_line;
pub mod document_id;
mod invoice;
mod product;

pub use cart_line::{CartLine, LineSelector};
pub use invoice::{DeliveryMethod, Deposit, Invoice, PaymentMethod, PaymentStatus};
pub use product::Product;
