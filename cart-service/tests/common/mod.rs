#![allow(dead_code)]

use cart_service::config::{CartConfig, CartSettings, CorsConfig, MongoConfig, StoreBackend, StoreConfig};
use cart_service::models::Product;
use cart_service::services::{InMemoryInvoiceRepository, InMemoryProductCatalog, InvoiceStore};
use cart_service::Application;
use rust_decimal::Decimal;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;

pub const TEST_USER_ID: &str = "user_123";
pub const OTHER_USER_ID: &str = "user_456";

/// Ceiling 5 (purchase limit), price 100.00.
pub const TEE: &str = "tee";
/// Ceiling 3 (stock), price 12.50.
pub const MUG: &str = "mug";
/// Out of stock.
pub const CAP: &str = "cap";
/// Ceiling 2, price 5.00.
pub const SOCK: &str = "sock";

pub fn product(id: &str, sale_price: Decimal, stock: u32, purchase: u32) -> Product {
    Product {
        id: id.to_string(),
        sale_price,
        stock_quantity: stock,
        purchase_quantity: purchase,
        size: "M".to_string(),
        color: "black".to_string(),
    }
}

pub fn seeded_catalog() -> InMemoryProductCatalog {
    let catalog = InMemoryProductCatalog::new();
    catalog.insert(product(TEE, Decimal::new(10000, 2), 10, 5));
    catalog.insert(product(MUG, Decimal::new(1250, 2), 3, 10));
    catalog.insert(product(CAP, Decimal::new(2000, 2), 0, 5));
    catalog.insert(product(SOCK, Decimal::new(500, 2), 100, 2));
    catalog
}

pub fn test_config() -> CartConfig {
    CartConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            environment: "test".to_string(),
        },
        mongodb: MongoConfig {
            uri: Secret::new("mongodb://localhost:27017".to_string()),
            database: "cart_test".to_string(),
        },
        store: StoreConfig {
            backend: StoreBackend::Memory,
        },
        cart: CartSettings {
            display_tax_rate: Decimal::new(15, 2),
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

/// Invoice store over fresh in-memory backends.
pub struct TestStore {
    pub store: InvoiceStore,
    pub repository: InMemoryInvoiceRepository,
    pub catalog: InMemoryProductCatalog,
}

impl TestStore {
    pub fn new() -> Self {
        let repository = InMemoryInvoiceRepository::new();
        let catalog = seeded_catalog();
        let store = InvoiceStore::new(
            Arc::new(repository.clone()),
            Arc::new(catalog.clone()),
            Decimal::new(15, 2),
        );
        Self {
            store,
            repository,
            catalog,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub repository: InMemoryInvoiceRepository,
    pub catalog: InMemoryProductCatalog,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let repository = InMemoryInvoiceRepository::new();
        let catalog = seeded_catalog();

        let app = Application::build_with(
            test_config(),
            Arc::new(repository.clone()),
            Arc::new(catalog.clone()),
        )
        .await
        .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            repository,
            catalog,
        }
    }

    pub async fn add_to_cart(&self, user_id: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}/invoices", self.address))
            .header("X-User-ID", user_id)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn add_product(&self, user_id: &str, product_id: &str) -> reqwest::Response {
        self.add_to_cart(user_id, serde_json::json!({ "product_id": product_id }))
            .await
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}
