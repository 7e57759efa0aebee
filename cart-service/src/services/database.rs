//! MongoDB connection and index management for cart-service.

use crate::models::{Invoice, PaymentStatus};
use mongodb::{
    bson::doc, options::IndexOptions, Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

pub const INVOICES_COLLECTION: &str = "invoices";
pub const PRODUCTS_COLLECTION: &str = "products";

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let mut options = mongodb::options::ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::from(e)
        })?;
        options.app_name = Some("cart-service".to_string());

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for cart-service");

        let invoices = self.invoices();

        // Newest-first listing per user
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_created_lookup".to_string())
                    .build(),
            )
            .build();

        // At most one unpaid invoice (the cart) per user
        let open_cart_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("one_open_cart_per_user".to_string())
                    .unique(true)
                    .partial_filter_expression(
                        doc! { "payment_status": PaymentStatus::Unpaid.as_str() },
                    )
                    .build(),
            )
            .build();

        invoices
            .create_indexes([user_index, open_cart_index], None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create indexes on invoices collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created indexes on invoices.(user_id, created_at) and open cart");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn invoices(&self) -> Collection<Invoice> {
        self.db.collection(INVOICES_COLLECTION)
    }

    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
