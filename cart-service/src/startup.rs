use crate::config::{CartConfig, StoreBackend};
use crate::handlers::{self, invoices};
use crate::services::{
    InMemoryInvoiceRepository, InMemoryProductCatalog, InvoiceRepository, InvoiceStore,
    MongoDb, MongoInvoiceRepository, MongoProductCatalog, ProductCatalog,
};
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::{
    routing::{delete, get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: CartConfig,
    pub store: InvoiceStore,
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build against the configured backend.
    pub async fn build(config: CartConfig) -> Result<Self, AppError> {
        let (repository, catalog): (Arc<dyn InvoiceRepository>, Arc<dyn ProductCatalog>) =
            match config.store.backend {
                StoreBackend::Mongo => {
                    let db = MongoDb::connect(
                        config.mongodb.uri.expose_secret(),
                        &config.mongodb.database,
                    )
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to MongoDB: {}", e);
                        e
                    })?;
                    db.initialize_indexes().await.map_err(|e| {
                        tracing::error!("Failed to initialize database indexes: {}", e);
                        e
                    })?;
                    (
                        Arc::new(MongoInvoiceRepository::new(&db)),
                        Arc::new(MongoProductCatalog::new(&db)),
                    )
                }
                StoreBackend::Memory => {
                    tracing::warn!("Using in-memory store; invoices and catalog start empty");
                    (
                        Arc::new(InMemoryInvoiceRepository::new()),
                        Arc::new(InMemoryProductCatalog::new()),
                    )
                }
            };

        Self::build_with(config, repository, catalog).await
    }

    /// Build against explicit backends.
    pub async fn build_with(
        config: CartConfig,
        repository: Arc<dyn InvoiceRepository>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Result<Self, AppError> {
        let store = InvoiceStore::new(repository, catalog, config.cart.display_tax_rate);
        let state = AppState {
            config: config.clone(),
            store,
        };
        let router = router(state)?;

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

fn cors_layer(config: &CartConfig) -> Result<CorsLayer, AppError> {
    let origins = config
        .cors
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin {}: {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .allow_credentials(true))
}

pub fn router(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config)?;

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::upsert_line),
        )
        .route("/invoices/user/:user_id", get(invoices::list_user_invoices))
        .route(
            "/invoices/:invoice_id",
            axum::routing::put(invoices::update_invoice).delete(invoices::delete_invoice),
        )
        .route(
            "/invoices/:invoice_id/lines/:product_id",
            delete(invoices::remove_line),
        )
        .route(
            "/invoices/:invoice_id/lines/:product_id/increment",
            post(invoices::increment_line),
        )
        .route(
            "/invoices/:invoice_id/lines/:product_id/decrement",
            post(invoices::decrement_line),
        )
        .route(
            "/invoices/:invoice_id/cart/:line_id",
            delete(invoices::remove_cart_line),
        )
        .route(
            "/invoices/:invoice_id/deposits",
            post(invoices::record_deposit),
        )
        .route("/cart/summary", get(invoices::cart_summary))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state);

    Ok(router)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
