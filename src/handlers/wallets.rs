//! Wallet HTTP handlers.
//!
//! This module implements wallet-related API endpoints:
//! - POST /api/v1/wallets - Open a wallet
//! - GET /api/v1/wallets/{id} - Public wallet view
//! - GET /internal/v1/wallets/{id} - Full wallet record
//! - POST /api/v1/wallets/{id}/credit|debit|freeze-funds|unfreeze-funds - Move funds
//! - POST /api/v1/wallets/{id}/status - Activate, suspend, freeze or close
//! - POST /api/v1/wallets/{id}/limits - Replace usage limits
//! - POST /api/v1/wallets/{id}/primary - Set or clear the primary flag

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::wallet::{
        AmountRequest, CreateWalletRequest, SetPrimaryRequest, UpdateLimitsRequest, Wallet,
        WalletAction, WalletResponse, WalletStatusRequest,
    },
    state::AppState,
};

fn respond(state: &AppState, wallet: &Wallet) -> Result<Json<WalletResponse>, AppError> {
    Ok(Json(WalletResponse::new(wallet, &state.registry, Utc::now())?))
}

/// Open a wallet.
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": "550e8400-...",
///   "currency": "USD",
///   "is_primary": true
/// }
/// ```
///
/// # Response (201)
///
/// The public wallet view with registry default limits applied.
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(request): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<WalletResponse>), AppError> {
    let now = Utc::now();
    let wallet = state.wallets.create(&request, now)?;
    let wallet = state.store.insert_wallet(wallet, now).await?;

    Ok((StatusCode::CREATED, respond(&state, &wallet)?))
}

pub async fn get_wallet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state.store.wallet(id).await?;
    respond(&state, &wallet)
}

/// Full wallet record for internal callers.
pub async fn get_wallet_internal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Wallet>, AppError> {
    Ok(Json(state.store.wallet(id).await?))
}

/// Add funds.
///
/// # Errors
///
/// - `409`: wallet is frozen or closed
/// - `422`: balance would overflow
pub async fn credit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let now = Utc::now();
    let wallet = state
        .store
        .update_wallet(id, |w| {
            w.credit(request.amount, now)?;
            Ok(w.clone())
        })
        .await?;

    tracing::info!(wallet_id = %id, amount = request.amount, "wallet credited");
    respond(&state, &wallet)
}

/// Withdraw funds, counting towards the rolling limits.
///
/// # Errors
///
/// - `409`: wallet is not active
/// - `422`: insufficient available balance, or a daily/monthly limit breach
pub async fn debit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let now = Utc::now();
    let wallet = state
        .store
        .update_wallet(id, |w| {
            w.debit(request.amount, now)?;
            Ok(w.clone())
        })
        .await?;

    tracing::info!(wallet_id = %id, amount = request.amount, "wallet debited");
    respond(&state, &wallet)
}

pub async fn freeze_funds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let now = Utc::now();
    let wallet = state
        .store
        .update_wallet(id, |w| {
            w.freeze_funds(request.amount, now)?;
            Ok(w.clone())
        })
        .await?;
    respond(&state, &wallet)
}

pub async fn unfreeze_funds(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let now = Utc::now();
    let wallet = state
        .store
        .update_wallet(id, |w| {
            w.unfreeze_funds(request.amount, now)?;
            Ok(w.clone())
        })
        .await?;
    respond(&state, &wallet)
}

/// Change the wallet status.
///
/// # Request Body
///
/// ```json
/// { "action": "suspend" }
/// ```
///
/// `close` only succeeds on an empty wallet and is irreversible.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<WalletStatusRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let now = Utc::now();
    let wallet = state
        .store
        .update_wallet(id, |w| {
            match request.action {
                WalletAction::Activate => w.activate(now)?,
                WalletAction::Suspend => w.suspend(now)?,
                WalletAction::Freeze => w.freeze(now)?,
                WalletAction::Close => w.close(now)?,
            }
            Ok(w.clone())
        })
        .await?;

    tracing::info!(wallet_id = %id, status = %wallet.status(), "wallet status changed");
    respond(&state, &wallet)
}

pub async fn update_limits(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLimitsRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let now = Utc::now();
    let wallet = state
        .store
        .update_wallet(id, |w| {
            w.update_limits(request.daily_limit, request.monthly_limit, now)?;
            Ok(w.clone())
        })
        .await?;
    respond(&state, &wallet)
}

/// Set or clear the primary flag. Setting it demotes the user's other wallets.
pub async fn set_primary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetPrimaryRequest>,
) -> Result<Json<WalletResponse>, AppError> {
    let wallet = state
        .store
        .set_primary_wallet(id, request.is_primary, Utc::now())
        .await?;
    respond(&state, &wallet)
}
