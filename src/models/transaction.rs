//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: the money-movement record and its lifecycle state
//! - `TransactionType` / `TransactionStatus` and the transition table
//! - `CreateTransactionRequest` and the transition request bodies
//! - `TransactionResponse`: the public projection returned to end users
//!
//! Creation, validation and transitions live in
//! [`services::transaction_engine`](crate::services::transaction_engine).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::LedgerError, models::currency::Currency,
    services::currency_registry::CurrencyRegistry,
};

/// Kind of money movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
    Refund,
    Fee,
    Exchange,
    Reward,
    Penalty,
}

impl TransactionType {
    /// Three-letter prefix used in generated references.
    pub fn reference_prefix(self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEP",
            TransactionType::Withdrawal => "WDR",
            TransactionType::Transfer => "TRF",
            TransactionType::Payment => "PAY",
            TransactionType::Refund => "REF",
            TransactionType::Fee => "FEE",
            TransactionType::Exchange => "EXC",
            TransactionType::Reward => "RWD",
            TransactionType::Penalty => "PEN",
        }
    }

    /// Transfers, payments and refunds always name the other party.
    pub fn requires_counterparty(self) -> bool {
        matches!(
            self,
            TransactionType::Transfer | TransactionType::Payment | TransactionType::Refund
        )
    }

    /// Movements between the wallet and the outside world never name one.
    pub fn forbids_counterparty(self) -> bool {
        matches!(
            self,
            TransactionType::Deposit
                | TransactionType::Withdrawal
                | TransactionType::Fee
                | TransactionType::Reward
                | TransactionType::Penalty
        )
    }

    /// Money leaves the wallet.
    pub fn is_outbound(self) -> bool {
        matches!(
            self,
            TransactionType::Withdrawal | TransactionType::Transfer | TransactionType::Payment
        )
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
            TransactionType::Payment => "payment",
            TransactionType::Refund => "refund",
            TransactionType::Fee => "fee",
            TransactionType::Exchange => "exchange",
            TransactionType::Reward => "reward",
            TransactionType::Penalty => "penalty",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a transaction.
///
/// ```text
/// Pending ──> Processing ──> Completed ──> Refunded
///    │            └────────> Failed
///    ├──> Cancelled
///    └──> Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Refunded,
}

impl TransactionStatus {
    /// Outgoing edges of the state machine.
    pub fn allowed_transitions(self) -> &'static [TransactionStatus] {
        use TransactionStatus::*;
        match self {
            Pending => &[Processing, Cancelled, Expired],
            Processing => &[Completed, Failed],
            Completed => &[Refunded],
            Failed | Cancelled | Expired | Refunded => &[],
        }
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Expired => "expired",
            TransactionStatus::Refunded => "refunded",
        };
        f.write_str(name)
    }
}

/// A money-movement record drawn against one wallet.
///
/// Amounts are minor units of `currency`. `net_amount` is always
/// `amount - fee_amount`.
///
/// Fields are crate-private; status and timestamps only change through the
/// transition methods so the status-consistency rules always hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub(crate) id: Uuid,
    pub(crate) wallet_id: Uuid,
    pub(crate) counterparty_id: Option<Uuid>,
    pub(crate) transaction_type: TransactionType,
    pub(crate) status: TransactionStatus,
    pub(crate) currency: Currency,
    pub(crate) amount: i64,
    pub(crate) fee_amount: i64,
    pub(crate) net_amount: i64,
    pub(crate) exchange_rate: Option<f64>,
    pub(crate) reference: String,
    pub(crate) description: Option<String>,
    pub(crate) external_id: Option<String>,
    pub(crate) processor_response: Option<String>,
    pub(crate) failure_reason: Option<String>,
    pub(crate) metadata: BTreeMap<String, String>,
    pub(crate) processed_at: Option<DateTime<Utc>>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn wallet_id(&self) -> Uuid {
        self.wallet_id
    }

    pub fn counterparty_id(&self) -> Option<Uuid> {
        self.counterparty_id
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn fee_amount(&self) -> i64 {
        self.fee_amount
    }

    pub fn net_amount(&self) -> i64 {
        self.net_amount
    }

    pub fn exchange_rate(&self) -> Option<f64> {
        self.exchange_rate
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn processor_response(&self) -> Option<&str> {
        self.processor_response.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Request to create a transaction.
///
/// # JSON Example
///
/// ```json
/// {
///   "wallet_id": "550e8400-e29b-41d4-a716-446655440000",
///   "counterparty_id": "660e8400-e29b-41d4-a716-446655440001",
///   "transaction_type": "transfer",
///   "currency": "USD",
///   "amount": 25000,
///   "fee_amount": 250,
///   "description": "Dinner split",
///   "metadata": { "chat_id": "c-42" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransactionRequest {
    pub wallet_id: Uuid,

    #[serde(default)]
    pub counterparty_id: Option<Uuid>,

    pub transaction_type: TransactionType,

    /// ISO 4217 code, checked against the currency registry
    pub currency: String,

    /// Gross amount in minor units
    pub amount: i64,

    /// Defaults to 0
    #[serde(default)]
    pub fee_amount: Option<i64>,

    #[serde(default)]
    pub exchange_rate: Option<f64>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub external_id: Option<String>,

    /// Defaults to creation time plus the engine's expiry window
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Body for `POST /transactions/{id}/complete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub processor_response: Option<String>,
}

/// Body for `POST /transactions/{id}/fail`.
#[derive(Debug, Clone, Deserialize)]
pub struct FailRequest {
    pub reason: String,
}

/// Public projection of a transaction.
///
/// Leaves out `external_id`, `processor_response` and `metadata`, which
/// are for internal and audit use. Privileged callers get the full
/// [`Transaction`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub counterparty_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub currency: Currency,
    pub amount: i64,
    pub fee_amount: i64,
    pub net_amount: i64,
    pub formatted_amount: String,
    pub exchange_rate: Option<f64>,
    pub reference: String,
    pub description: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransactionResponse {
    pub fn new(transaction: Transaction, registry: &CurrencyRegistry) -> Result<Self, LedgerError> {
        let formatted_amount = registry.format_amount(transaction.amount, transaction.currency)?;

        Ok(Self {
            id: transaction.id,
            wallet_id: transaction.wallet_id,
            counterparty_id: transaction.counterparty_id,
            transaction_type: transaction.transaction_type,
            status: transaction.status,
            currency: transaction.currency,
            amount: transaction.amount,
            fee_amount: transaction.fee_amount,
            net_amount: transaction.net_amount,
            formatted_amount,
            exchange_rate: transaction.exchange_rate,
            reference: transaction.reference,
            description: transaction.description,
            failure_reason: transaction.failure_reason,
            processed_at: transaction.processed_at,
            completed_at: transaction.completed_at,
            expires_at: transaction.expires_at,
            created_at: transaction.created_at,
            updated_at: transaction.updated_at,
        })
    }
}
