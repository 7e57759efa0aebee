//! Invoice and cart handlers.
//!
//! Handlers translate HTTP into [`InvoiceStore`](crate::services::InvoiceStore)
//! calls; every rule lives in the store.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use validator::Validate;

use crate::dtos::{
    CartMutationResponse, CartSummaryResponse, DepositRequest, InvoiceRequest, InvoiceResponse,
    UpsertLineRequest,
};
use crate::middleware::UserId;
use crate::models::LineSelector;
use crate::startup::AppState;

fn to_responses(invoices: Vec<crate::models::Invoice>) -> Vec<InvoiceResponse> {
    invoices.into_iter().map(InvoiceResponse::from).collect()
}

pub async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let invoices = state.store.list_all().await?;
    Ok(Json(to_responses(invoices)))
}

pub async fn list_user_invoices(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<InvoiceResponse>>, AppError> {
    let invoices = state.store.list_for_user(&user_id).await?;
    Ok(Json(to_responses(invoices)))
}

/// Add to cart. Responds 201 when a new invoice was opened.
pub async fn upsert_line(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(payload): Json<UpsertLineRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    payload.validate()?;

    tracing::info!(user_id = %user_id, "Adding to cart");

    let invoice = state.store.upsert_line(&user_id, payload.into()).await?;
    let status = if invoice.version == 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(InvoiceResponse::from(invoice))))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(payload): Json<InvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    payload.validate()?;

    tracing::info!(invoice_id = %invoice_id, "Updating invoice");

    let invoice = state
        .store
        .update_invoice(&invoice_id, payload.into())
        .await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn increment_line(
    State(state): State<AppState>,
    Path((invoice_id, product_id)): Path<(String, String)>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .store
        .increment_line(&invoice_id, &product_id)
        .await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn decrement_line(
    State(state): State<AppState>,
    Path((invoice_id, product_id)): Path<(String, String)>,
) -> Result<Json<CartMutationResponse>, AppError> {
    let outcome = state
        .store
        .decrement_line(&invoice_id, &product_id)
        .await?;
    Ok(Json(CartMutationResponse::from_outcome(
        outcome,
        "Cart item quantity decreased",
    )))
}

pub async fn remove_line(
    State(state): State<AppState>,
    Path((invoice_id, product_id)): Path<(String, String)>,
) -> Result<Json<CartMutationResponse>, AppError> {
    tracing::info!(invoice_id = %invoice_id, product_id = %product_id, "Removing cart item");

    let outcome = state
        .store
        .remove_line(&invoice_id, LineSelector::Product(product_id))
        .await?;
    Ok(Json(CartMutationResponse::from_outcome(
        outcome,
        "Cart item deleted successfully",
    )))
}

pub async fn remove_cart_line(
    State(state): State<AppState>,
    Path((invoice_id, line_id)): Path<(String, String)>,
) -> Result<Json<CartMutationResponse>, AppError> {
    tracing::info!(invoice_id = %invoice_id, line_id = %line_id, "Removing cart line");

    let outcome = state
        .store
        .remove_line(&invoice_id, LineSelector::Line(line_id))
        .await?;
    Ok(Json(CartMutationResponse::from_outcome(
        outcome,
        "Cart item deleted successfully",
    )))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<CartMutationResponse>, AppError> {
    tracing::info!(invoice_id = %invoice_id, "Deleting invoice");

    let deleted = state.store.delete_invoice(&invoice_id).await?;
    Ok(Json(CartMutationResponse::from(deleted)))
}

pub async fn record_deposit(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(payload): Json<DepositRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .store
        .record_deposit(&invoice_id, payload.deposit_amount)
        .await?;
    Ok(Json(InvoiceResponse::from(invoice)))
}

pub async fn cart_summary(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<CartSummaryResponse>, AppError> {
    let summary = state.store.cart_summary(&user_id).await?;
    Ok(Json(CartSummaryResponse::from(summary)))
}
