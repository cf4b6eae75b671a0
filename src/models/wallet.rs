//! Wallet data models and API request/response types.
//!
//! This module defines:
//! - `Wallet`: the ledger entity holding balances and rolling usage
//! - `CreateWalletRequest` and the mutation request bodies
//! - `WalletResponse`: the public projection returned to end users
//!
//! The operations that mutate a wallet live in
//! [`services::wallet_ledger`](crate::services::wallet_ledger).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::LedgerError, models::currency::Currency,
    services::currency_registry::CurrencyRegistry,
};

/// Lifecycle status of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Suspended,
    Frozen,
    Closed,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Active => write!(f, "active"),
            WalletStatus::Suspended => write!(f, "suspended"),
            WalletStatus::Frozen => write!(f, "frozen"),
            WalletStatus::Closed => write!(f, "closed"),
        }
    }
}

/// A user's balance in one currency.
///
/// # Balance Storage
///
/// Every amount is an `i64` in the currency's minor unit:
/// - USD 10.50 is stored as 1050
/// - IDR 10,000 is stored as 10000 (no fractional unit)
///
/// # Invariants
///
/// - `0 <= frozen_balance <= balance`
/// - `daily_limit <= monthly_limit` whenever both are nonzero
/// - a limit of zero means "no limit"
///
/// Fields are crate-private: outside callers read them through accessors
/// and change them only through the named ledger operations. Serde keeps
/// every field so a wallet survives a round trip through storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) currency: Currency,
    pub(crate) balance: i64,
    pub(crate) frozen_balance: i64,
    pub(crate) daily_limit: i64,
    pub(crate) monthly_limit: i64,
    pub(crate) used_this_day: i64,
    pub(crate) used_this_month: i64,
    pub(crate) last_daily_reset: DateTime<Utc>,
    pub(crate) last_monthly_reset: DateTime<Utc>,
    pub(crate) status: WalletStatus,
    pub(crate) is_primary: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Total balance, frozen funds included.
    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn frozen_balance(&self) -> i64 {
        self.frozen_balance
    }

    /// Funds that can be spent right now.
    pub fn available_balance(&self) -> i64 {
        self.balance.saturating_sub(self.frozen_balance)
    }

    pub fn daily_limit(&self) -> i64 {
        self.daily_limit
    }

    pub fn monthly_limit(&self) -> i64 {
        self.monthly_limit
    }

    /// Usage counter as last stored. Use
    /// [`rolling_usage`](Wallet::rolling_usage) for the value at a given instant.
    pub fn used_this_day(&self) -> i64 {
        self.used_this_day
    }

    pub fn used_this_month(&self) -> i64 {
        self.used_this_month
    }

    pub fn last_daily_reset(&self) -> DateTime<Utc> {
        self.last_daily_reset
    }

    pub fn last_monthly_reset(&self) -> DateTime<Utc> {
        self.last_monthly_reset
    }

    pub fn status(&self) -> WalletStatus {
        self.status
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Request body for creating a new wallet.
///
/// # JSON Example
///
/// ```json
/// {
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "currency": "IDR",
///   "is_primary": true
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWalletRequest {
    pub user_id: Uuid,

    /// ISO 4217 code, checked against the currency registry
    pub currency: String,

    #[serde(default)]
    pub is_primary: bool,
}

/// Request body carrying a single minor-unit amount (credit, debit, freeze).
#[derive(Debug, Clone, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

/// Status change requested through `POST /wallets/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletAction {
    Activate,
    Suspend,
    Freeze,
    Close,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletStatusRequest {
    pub action: WalletAction,
}

/// New usage limits. Zero disables the corresponding limit.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateLimitsRequest {
    pub daily_limit: i64,
    pub monthly_limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetPrimaryRequest {
    pub is_primary: bool,
}

/// Public projection of a wallet.
///
/// Carries raw minor-unit amounts plus their display strings.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "550e8400-e29b-41d4-a716-446655440000",
///   "currency": "USD",
///   "balance": 150000,
///   "available_balance": 140000,
///   "formatted_balance": "$ 1500.00",
///   "status": "active",
///   "is_primary": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletResponse {
    pub id: Uuid,
    pub currency: Currency,
    pub balance: i64,
    pub frozen_balance: i64,
    pub available_balance: i64,
    pub formatted_balance: String,
    pub formatted_available_balance: String,
    pub daily_limit: i64,
    pub monthly_limit: i64,
    pub used_this_day: i64,
    pub used_this_month: i64,
    pub status: WalletStatus,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletResponse {
    /// Build the projection as seen at `now`, so usage counters that
    /// belong to a past day or month read as zero.
    pub fn new(
        wallet: &Wallet,
        registry: &CurrencyRegistry,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let usage = wallet.rolling_usage(now);

        Ok(Self {
            id: wallet.id,
            currency: wallet.currency,
            balance: wallet.balance,
            frozen_balance: wallet.frozen_balance,
            available_balance: wallet.available_balance(),
            formatted_balance: registry.format_amount(wallet.balance, wallet.currency)?,
            formatted_available_balance: registry
                .format_amount(wallet.available_balance(), wallet.currency)?,
            daily_limit: wallet.daily_limit,
            monthly_limit: wallet.monthly_limit,
            used_this_day: usage.used_this_day,
            used_this_month: usage.used_this_month,
            status: wallet.status,
            is_primary: wallet.is_primary,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        })
    }
}
