//! Error types and HTTP error response handling.
//!
//! Two layers live here:
//! - `LedgerError`: everything the wallet, transaction and payment method
//!   logic can reject. Pure domain, no HTTP knowledge.
//! - `AppError`: what HTTP handlers return. Wraps `LedgerError` and adds the
//!   lookup failures that only exist once entities are stored somewhere.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::models::{
    currency::Currency, payment_method::PaymentMethodStatus, transaction::TransactionStatus,
    wallet::WalletStatus,
};

/// Domain error type for the ledger core.
///
/// # Error Categories
///
/// - **Validation**: aggregated structural violations, every broken rule listed
/// - **Transitions**: illegal state changes, fail-fast, naming both states
/// - **Funds and limits**: balance, limit and currency checks naming the
///   exact constraint that was breached
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// One or more field-level rules were violated.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// Monetary amounts must be strictly positive.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(i64),

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    #[error("insufficient frozen balance: frozen {frozen}, requested {requested}")]
    InsufficientFrozenBalance { frozen: i64, requested: i64 },

    #[error("daily limit exceeded: limit {limit}, used {used}, requested {requested}")]
    DailyLimitExceeded {
        limit: i64,
        used: i64,
        requested: i64,
    },

    #[error("monthly limit exceeded: limit {limit}, used {used}, requested {requested}")]
    MonthlyLimitExceeded {
        limit: i64,
        used: i64,
        requested: i64,
    },

    /// A single outbound transaction is larger than the wallet's daily limit.
    #[error("amount {requested} exceeds daily limit {limit}")]
    AmountExceedsDailyLimit { limit: i64, requested: i64 },

    /// Arithmetic on a balance or counter would leave the i64 range.
    #[error("amount overflow")]
    Overflow,

    #[error("wallet is {0}, only active wallets can send funds")]
    WalletNotActive(WalletStatus),

    #[error("wallet is {0} and cannot receive funds")]
    WalletCannotReceive(WalletStatus),

    /// Closed wallets are terminal.
    #[error("wallet is closed")]
    WalletClosed,

    #[error("wallet still holds funds: balance {balance}, frozen {frozen_balance}")]
    WalletNotEmpty { balance: i64, frozen_balance: i64 },

    #[error("transaction belongs to wallet {transaction_wallet}, not {wallet}")]
    WalletMismatch {
        wallet: Uuid,
        transaction_wallet: Uuid,
    },

    #[error("currency mismatch: expected {expected}, got {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    /// Expire was called before the transaction's expiry instant.
    #[error("transaction does not expire until {expires_at}")]
    PrematureExpiry { expires_at: DateTime<Utc> },

    #[error("invalid payment method transition from {from} to {to}")]
    InvalidPaymentMethodTransition {
        from: PaymentMethodStatus,
        to: PaymentMethodStatus,
    },

    #[error("payment method is {0}, only active payment methods can be used")]
    PaymentMethodNotActive(PaymentMethodStatus),
}

impl LedgerError {
    /// Turn a list of violations into a result.
    pub fn check(violations: Vec<String>) -> Result<(), LedgerError> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation(violations))
        }
    }
}

/// Application-wide error type returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The ledger core rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Wallet not found")]
    WalletNotFound,

    #[error("Transaction not found")]
    TransactionNotFound,

    #[error("Payment method not found")]
    PaymentMethodNotFound,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::WalletNotFound => (StatusCode::NOT_FOUND, "wallet_not_found"),
            AppError::TransactionNotFound => (StatusCode::NOT_FOUND, "transaction_not_found"),
            AppError::PaymentMethodNotFound => {
                (StatusCode::NOT_FOUND, "payment_method_not_found")
            }
            AppError::Ledger(err) => match err {
                LedgerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
                LedgerError::UnsupportedCurrency(_) => {
                    (StatusCode::BAD_REQUEST, "unsupported_currency")
                }
                LedgerError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
                LedgerError::InsufficientBalance { .. }
                | LedgerError::InsufficientFrozenBalance { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_balance")
                }
                LedgerError::DailyLimitExceeded { .. }
                | LedgerError::MonthlyLimitExceeded { .. }
                | LedgerError::AmountExceedsDailyLimit { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "limit_exceeded")
                }
                LedgerError::Overflow => (StatusCode::UNPROCESSABLE_ENTITY, "amount_overflow"),
                LedgerError::CurrencyMismatch { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "currency_mismatch")
                }
                LedgerError::WalletMismatch { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "wallet_mismatch")
                }
                LedgerError::WalletNotActive(_)
                | LedgerError::WalletCannotReceive(_)
                | LedgerError::WalletClosed
                | LedgerError::WalletNotEmpty { .. }
                | LedgerError::PaymentMethodNotActive(_) => (StatusCode::CONFLICT, "invalid_state"),
                LedgerError::InvalidTransition { .. }
                | LedgerError::InvalidPaymentMethodTransition { .. }
                | LedgerError::PrematureExpiry { .. } => {
                    (StatusCode::CONFLICT, "invalid_transition")
                }
            },
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": {
///     "code": "error_type",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
