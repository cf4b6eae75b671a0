//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /api/v1/transactions - Create a pending transaction
//! - GET /api/v1/transactions/{id} - Public transaction view
//! - GET /internal/v1/transactions/{id} - Full record incl. metadata
//! - POST /api/v1/transactions/{id}/process|complete|fail|cancel|expire|refund

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, LedgerError},
    models::transaction::{
        CompleteRequest, CreateTransactionRequest, FailRequest, Transaction, TransactionResponse,
    },
    state::AppState,
};

fn respond(
    state: &AppState,
    transaction: Transaction,
) -> Result<Json<TransactionResponse>, AppError> {
    Ok(Json(TransactionResponse::new(transaction, &state.registry)?))
}

/// Create a pending transaction against a wallet.
///
/// # Request Body
///
/// ```json
/// {
///   "wallet_id": "550e8400-...",
///   "counterparty_id": "660e8400-...",
///   "transaction_type": "transfer",
///   "currency": "USD",
///   "amount": 25000,
///   "fee_amount": 250
/// }
/// ```
///
/// # Validation
///
/// - Every structural problem is reported at once (`400 validation_failed`)
/// - Outbound transactions are checked against the wallet's available
///   balance and daily limit (`422`)
/// - Currency must match the wallet's (`422 currency_mismatch`)
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), AppError> {
    let transaction = state.transactions.create(request, Utc::now())?;
    let transaction = state.store.create_transaction(transaction).await?;

    Ok((StatusCode::CREATED, respond(&state, transaction)?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state.store.transaction(id).await?;
    respond(&state, transaction)
}

/// Full record for internal callers.
pub async fn get_transaction_internal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    Ok(Json(state.store.transaction(id).await?))
}

/// Apply a transition to the stored transaction and project the result.
async fn transition<F>(
    state: &AppState,
    id: Uuid,
    apply: F,
) -> Result<Json<TransactionResponse>, AppError>
where
    F: FnOnce(&mut Transaction) -> Result<(), LedgerError>,
{
    let transaction = state
        .store
        .update_transaction(id, |tx| {
            apply(tx)?;
            Ok(tx.clone())
        })
        .await?;

    tracing::info!(
        transaction_id = %id,
        status = %transaction.status(),
        "transaction transitioned"
    );
    respond(state, transaction)
}

pub async fn process(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    transition(&state, id, |tx| tx.start_processing(Utc::now())).await
}

/// # Request Body
///
/// ```json
/// { "processor_response": "approved" }
/// ```
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    transition(&state, id, |tx| tx.complete(request.processor_response, Utc::now())).await
}

/// # Request Body
///
/// ```json
/// { "reason": "card declined" }
/// ```
pub async fn fail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FailRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    transition(&state, id, |tx| tx.fail(&request.reason, Utc::now())).await
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    transition(&state, id, |tx| tx.cancel(Utc::now())).await
}

/// Expire a pending transaction. `409` if its expiry has not passed yet.
pub async fn expire(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    transition(&state, id, |tx| tx.expire(Utc::now())).await
}

pub async fn refund(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionResponse>, AppError> {
    transition(&state, id, |tx| tx.refund(Utc::now())).await
}
