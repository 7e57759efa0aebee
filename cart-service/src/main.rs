use cart_service::config::CartConfig;
use cart_service::services::metrics::init_metrics;
use cart_service::Application;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Metrics recorder must exist before the first request is counted
    init_metrics();

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT")
        .ok()
        .filter(|endpoint| !endpoint.is_empty());
    init_tracing("cart-service", "info,cart_service=debug", otlp_endpoint.as_deref());

    let config = CartConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to start cart-service: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
