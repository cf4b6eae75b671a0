//! Transaction engine - creation, validation and lifecycle transitions.
//!
//! # Process
//!
//! 1. `TransactionEngine::create` turns a request into a validated Pending
//!    transaction with a generated reference and default expiry
//! 2. The caller optionally checks it against the wallet it draws on
//!    (`Transaction::validate_against_wallet`)
//! 3. Transition methods move it through the state machine
//!
//! # Transition Guarantees
//!
//! Every transition checks the state table first and fails fast with
//! `InvalidTransition` naming both states. The change itself is applied to
//! a copy that must pass full validation before it replaces the original,
//! so a rejected call never leaves a half-updated transaction behind.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    models::{
        transaction::{CreateTransactionRequest, Transaction, TransactionStatus},
        wallet::Wallet,
    },
    services::currency_registry::CurrencyRegistry,
};

/// Largest single transaction amount, in minor units.
pub const MAX_TRANSACTION_AMOUNT: i64 = 100_000_000_000;

pub const MAX_REFERENCE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_EXTERNAL_ID_LENGTH: usize = 255;
pub const MAX_FAILURE_REASON_LENGTH: usize = 500;
pub const MAX_PROCESSOR_RESPONSE_LENGTH: usize = 2000;
pub const MAX_METADATA_KEYS: usize = 20;
pub const MAX_METADATA_KEY_LENGTH: usize = 64;
pub const MAX_METADATA_VALUE_LENGTH: usize = 500;

/// Window after creation in which a pending transaction must be picked up.
pub const DEFAULT_EXPIRY_HOURS: i64 = 24;

/// Creates transactions using the injected currency table and expiry window.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    registry: Arc<CurrencyRegistry>,
    default_expiry: Duration,
}

impl TransactionEngine {
    pub fn new(registry: Arc<CurrencyRegistry>, default_expiry: Duration) -> Self {
        Self {
            registry,
            default_expiry,
        }
    }

    /// Engine with the standard 24 hour expiry window.
    pub fn with_default_expiry(registry: Arc<CurrencyRegistry>) -> Self {
        Self::new(registry, Duration::hours(DEFAULT_EXPIRY_HOURS))
    }

    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    /// Build a new Pending transaction from a request.
    ///
    /// - generates the id and the reference
    /// - `fee_amount` defaults to 0 and `net_amount = amount - fee_amount`
    /// - `expires_at` defaults to `now + default_expiry`
    /// - `metadata` defaults to empty
    ///
    /// # Errors
    ///
    /// - `UnsupportedCurrency`: the registry does not carry the currency
    /// - `Validation`: every rule the new transaction breaks
    pub fn create(
        &self,
        request: CreateTransactionRequest,
        now: DateTime<Utc>,
    ) -> Result<Transaction, LedgerError> {
        let currency = self.registry.parse(&request.currency)?;
        let id = Uuid::new_v4();
        let fee_amount = request.fee_amount.unwrap_or(0);
        let expires_at = match request.expires_at {
            Some(at) => at,
            None => now.checked_add_signed(self.default_expiry).ok_or_else(|| {
                LedgerError::Validation(vec!["default expiry is out of range".to_string()])
            })?,
        };

        let transaction = Transaction {
            id,
            wallet_id: request.wallet_id,
            counterparty_id: request.counterparty_id,
            transaction_type: request.transaction_type,
            status: TransactionStatus::Pending,
            currency,
            amount: request.amount,
            fee_amount,
            net_amount: request.amount.saturating_sub(fee_amount),
            exchange_rate: request.exchange_rate,
            reference: generate_reference(&request, id, now),
            description: request.description,
            external_id: request.external_id,
            processor_response: None,
            failure_reason: None,
            metadata: request.metadata.unwrap_or_default(),
            processed_at: None,
            completed_at: None,
            expires_at: Some(expires_at),
            created_at: now,
            updated_at: now,
        };

        transaction.validate_at(now)?;
        Ok(transaction)
    }

    /// Display string for the transaction's gross amount.
    pub fn format_amount(&self, transaction: &Transaction) -> Result<String, LedgerError> {
        self.registry
            .format_amount(transaction.amount, transaction.currency)
    }
}

/// `<TYPE PREFIX><YYYYMMDDHHMMSS><first 8 hex chars of the id>`, e.g.
/// `TRF20261016093000A1B2C3D4`.
fn generate_reference(request: &CreateTransactionRequest, id: Uuid, now: DateTime<Utc>) -> String {
    let fragment = id.simple().to_string()[..8].to_ascii_uppercase();
    format!(
        "{}{}{}",
        request.transaction_type.reference_prefix(),
        now.format("%Y%m%d%H%M%S"),
        fragment
    )
}

fn check_length(errors: &mut Vec<String>, field: &str, value: Option<&str>, max: usize) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.push(format!("{} cannot exceed {} characters", field, max));
        }
    }
}

impl Transaction {
    /// Every rule this transaction breaks, judged at `now`.
    pub fn violations_at(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut errors = Vec::new();

        if self.wallet_id.is_nil() {
            errors.push("wallet_id is required".to_string());
        }

        // Amounts
        if self.amount <= 0 {
            errors.push("amount must be positive".to_string());
        }
        if self.amount > MAX_TRANSACTION_AMOUNT {
            errors.push(format!(
                "amount cannot exceed {}",
                MAX_TRANSACTION_AMOUNT
            ));
        }
        if self.fee_amount < 0 {
            errors.push("fee_amount cannot be negative".to_string());
        }
        if self.amount > 0 && self.fee_amount >= self.amount {
            errors.push("fee_amount must be less than amount".to_string());
        }
        if self.amount.checked_sub(self.fee_amount) != Some(self.net_amount) {
            errors.push("net_amount must equal amount minus fee_amount".to_string());
        }
        if let Some(rate) = self.exchange_rate {
            if !(rate.is_finite() && rate > 0.0) {
                errors.push("exchange_rate must be positive".to_string());
            }
        }

        // Text fields
        if self.reference.trim().is_empty() {
            errors.push("reference is required".to_string());
        }
        check_length(&mut errors, "reference", Some(&self.reference), MAX_REFERENCE_LENGTH);
        check_length(
            &mut errors,
            "description",
            self.description.as_deref(),
            MAX_DESCRIPTION_LENGTH,
        );
        check_length(
            &mut errors,
            "external_id",
            self.external_id.as_deref(),
            MAX_EXTERNAL_ID_LENGTH,
        );
        check_length(
            &mut errors,
            "failure_reason",
            self.failure_reason.as_deref(),
            MAX_FAILURE_REASON_LENGTH,
        );
        check_length(
            &mut errors,
            "processor_response",
            self.processor_response.as_deref(),
            MAX_PROCESSOR_RESPONSE_LENGTH,
        );

        // Metadata
        if self.metadata.len() > MAX_METADATA_KEYS {
            errors.push(format!(
                "metadata cannot have more than {} keys",
                MAX_METADATA_KEYS
            ));
        }
        for (key, value) in &self.metadata {
            if key.trim().is_empty() || key.chars().count() > MAX_METADATA_KEY_LENGTH {
                errors.push(format!(
                    "metadata key '{}' must be 1 to {} characters",
                    key, MAX_METADATA_KEY_LENGTH
                ));
            }
            if value.chars().count() > MAX_METADATA_VALUE_LENGTH {
                errors.push(format!(
                    "metadata value for '{}' cannot exceed {} characters",
                    key, MAX_METADATA_VALUE_LENGTH
                ));
            }
        }

        // Counterparty
        let kind = self.transaction_type;
        match self.counterparty_id {
            None if kind.requires_counterparty() => {
                errors.push(format!(
                    "counterparty_id is required for {} transactions",
                    kind
                ));
            }
            Some(_) if kind.forbids_counterparty() => {
                errors.push(format!(
                    "counterparty_id is not allowed for {} transactions",
                    kind
                ));
            }
            Some(counterparty) if counterparty == self.wallet_id => {
                errors.push("counterparty_id cannot be the transaction's own wallet".to_string());
            }
            _ => {}
        }

        // Status consistency
        match self.status {
            TransactionStatus::Processing if self.processed_at.is_none() => {
                errors.push("processing transaction must have processed_at".to_string());
            }
            TransactionStatus::Completed => {
                if self.processed_at.is_none() {
                    errors.push("completed transaction must have processed_at".to_string());
                }
                if self.completed_at.is_none() {
                    errors.push("completed transaction must have completed_at".to_string());
                }
            }
            TransactionStatus::Failed => {
                if self
                    .failure_reason
                    .as_deref()
                    .is_none_or(|r| r.trim().is_empty())
                {
                    errors.push("failed transaction must have a failure_reason".to_string());
                }
                if self.processed_at.is_none() {
                    errors.push("failed transaction must have processed_at".to_string());
                }
            }
            TransactionStatus::Expired => match self.expires_at {
                None => errors.push("expired transaction must have expires_at".to_string()),
                Some(expires_at) if expires_at > now => {
                    errors.push("expired transaction must have expires_at in the past".to_string());
                }
                Some(_) => {}
            },
            TransactionStatus::Refunded if self.completed_at.is_none() => {
                errors.push("refunded transaction must have completed_at".to_string());
            }
            _ => {}
        }

        errors
    }

    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        LedgerError::check(self.violations_at(now))
    }

    /// Validate against the current clock.
    pub fn validate(&self) -> Result<(), LedgerError> {
        self.validate_at(Utc::now())
    }

    /// Cross-check this transaction against the wallet it draws on.
    ///
    /// # Errors
    ///
    /// - `WalletMismatch`: the transaction names a different wallet
    /// - `CurrencyMismatch`: currencies differ
    /// - `AmountExceedsDailyLimit`: outbound amount above a nonzero daily limit
    /// - `InsufficientBalance`: outbound amount above the available balance
    pub fn validate_against_wallet(&self, wallet: &Wallet) -> Result<(), LedgerError> {
        if self.wallet_id != wallet.id() {
            return Err(LedgerError::WalletMismatch {
                wallet: wallet.id(),
                transaction_wallet: self.wallet_id,
            });
        }
        if self.currency != wallet.currency() {
            return Err(LedgerError::CurrencyMismatch {
                expected: wallet.currency(),
                found: self.currency,
            });
        }

        if self.transaction_type.is_outbound() {
            let daily_limit = wallet.daily_limit();
            if daily_limit > 0 && self.amount > daily_limit {
                return Err(LedgerError::AmountExceedsDailyLimit {
                    limit: daily_limit,
                    requested: self.amount,
                });
            }

            let available = wallet.available_balance();
            if self.amount > available {
                return Err(LedgerError::InsufficientBalance {
                    available,
                    requested: self.amount,
                });
            }
        }

        Ok(())
    }

    /// Pending -> Processing. Records `processed_at`.
    pub fn start_processing(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Processing, now, |tx| {
            tx.processed_at = Some(now);
            Ok(())
        })
    }

    /// Processing -> Completed. Records `completed_at` and clears the expiry.
    pub fn complete(
        &mut self,
        processor_response: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Completed, now, |tx| {
            tx.completed_at = Some(now);
            tx.expires_at = None;
            if processor_response.is_some() {
                tx.processor_response = processor_response;
            }
            Ok(())
        })
    }

    /// Processing -> Failed. A non-empty reason is mandatory.
    pub fn fail(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Failed, now, |tx| {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LedgerError::Validation(vec![
                    "failure reason is required".to_string(),
                ]));
            }
            tx.failure_reason = Some(reason.to_string());
            tx.processed_at.get_or_insert(now);
            Ok(())
        })
    }

    /// Pending -> Cancelled.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Cancelled, now, |_| Ok(()))
    }

    /// Pending -> Expired.
    ///
    /// Refuses to expire a transaction whose `expires_at` is still in the
    /// future (`PrematureExpiry`). A transaction without an expiry is
    /// stamped with `now`.
    pub fn expire(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Expired, now, |tx| match tx.expires_at {
            Some(expires_at) if expires_at > now => {
                Err(LedgerError::PrematureExpiry { expires_at })
            }
            Some(_) => Ok(()),
            None => {
                tx.expires_at = Some(now);
                Ok(())
            }
        })
    }

    /// Completed -> Refunded.
    pub fn refund(&mut self, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.transition(TransactionStatus::Refunded, now, |_| Ok(()))
    }

    /// Pending and past its expiry at `now`.
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Pending
            && self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    fn transition<F>(
        &mut self,
        to: TransactionStatus,
        now: DateTime<Utc>,
        apply: F,
    ) -> Result<(), LedgerError>
    where
        F: FnOnce(&mut Transaction) -> Result<(), LedgerError>,
    {
        let from = self.status;
        if !from.can_transition_to(to) {
            return Err(LedgerError::InvalidTransition { from, to });
        }

        let mut next = self.clone();
        apply(&mut next)?;
        next.status = to;
        next.updated_at = now;
        next.validate_at(now)?;

        tracing::debug!(transaction_id = %self.id, %from, %to, "transaction transition");
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use crate::models::{
        currency::Currency,
        transaction::TransactionType,
        wallet::CreateWalletRequest,
    };
    use crate::services::wallet_ledger::WalletLedger;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn engine() -> TransactionEngine {
        TransactionEngine::with_default_expiry(Arc::new(CurrencyRegistry::default()))
    }

    fn request(kind: TransactionType, amount: i64) -> CreateTransactionRequest {
        CreateTransactionRequest {
            wallet_id: Uuid::new_v4(),
            counterparty_id: kind.requires_counterparty().then(Uuid::new_v4),
            transaction_type: kind,
            currency: "USD".to_string(),
            amount,
            fee_amount: None,
            exchange_rate: None,
            description: None,
            metadata: None,
            external_id: None,
            expires_at: None,
        }
    }

    fn pending(kind: TransactionType) -> Transaction {
        engine()
            .create(request(kind, 10_000), now())
            .expect("should create transaction")
    }

    fn violations_of(result: Result<Transaction, LedgerError>) -> Vec<String> {
        match result {
            Err(LedgerError::Validation(v)) => v,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_defaults() {
        let mut req = request(TransactionType::Payment, 10_000);
        req.fee_amount = Some(250);
        let tx = engine().create(req, now()).unwrap();

        assert_eq!(TransactionStatus::Pending, tx.status());
        assert_eq!(Currency::Usd, tx.currency());
        assert_eq!(9_750, tx.net_amount());
        assert_eq!(Some(now() + Duration::hours(24)), tx.expires_at());
        assert!(tx.metadata().is_empty());
        assert_eq!(now(), tx.created_at());
    }

    #[test]
    fn test_reference_format() {
        let tx = pending(TransactionType::Deposit);
        let reference = tx.reference();

        assert!(reference.starts_with("DEP20261016093000"), "{}", reference);
        assert_eq!(3 + 14 + 8, reference.len());
        let fragment = &reference[17..];
        assert_eq!(
            tx.id().simple().to_string()[..8].to_ascii_uppercase(),
            fragment
        );
    }

    #[test]
    fn test_create_keeps_supplied_expiry() {
        let mut req = request(TransactionType::Deposit, 100);
        let expiry = now() + Duration::minutes(15);
        req.expires_at = Some(expiry);
        let tx = engine().create(req, now()).unwrap();
        assert_eq!(Some(expiry), tx.expires_at());
    }

    #[test]
    fn test_create_rejects_unsupported_currency() {
        let mut req = request(TransactionType::Deposit, 100);
        req.currency = "BTC".to_string();
        assert_eq!(
            Err(LedgerError::UnsupportedCurrency("BTC".to_string())),
            engine().create(req, now())
        );
    }

    #[test]
    fn test_transfer_requires_counterparty() {
        let mut req = request(TransactionType::Transfer, 100);
        req.counterparty_id = None;
        let violations = violations_of(engine().create(req, now()));
        assert_eq!(
            vec!["counterparty_id is required for transfer transactions".to_string()],
            violations
        );
    }

    #[test]
    fn test_deposit_forbids_counterparty() {
        let mut req = request(TransactionType::Deposit, 100);
        req.counterparty_id = Some(Uuid::new_v4());
        let violations = violations_of(engine().create(req, now()));
        assert!(violations[0].contains("not allowed for deposit"));
    }

    #[test]
    fn test_exchange_counterparty_is_optional() {
        let mut req = request(TransactionType::Exchange, 100);
        req.exchange_rate = Some(15_500.0);
        assert!(engine().create(req.clone(), now()).is_ok());

        req.counterparty_id = Some(Uuid::new_v4());
        assert!(engine().create(req, now()).is_ok());
    }

    #[test]
    fn test_validation_is_aggregated() {
        let mut req = request(TransactionType::Withdrawal, 100);
        req.fee_amount = Some(100);
        req.exchange_rate = Some(-1.0);
        req.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        req.metadata = Some(
            (0..=MAX_METADATA_KEYS)
                .map(|i| (format!("k{}", i), "v".to_string()))
                .collect(),
        );

        let violations = violations_of(engine().create(req, now()));
        assert_eq!(4, violations.len(), "{:?}", violations);
        assert!(violations.iter().any(|v| v.contains("fee_amount must be less")));
        assert!(violations.iter().any(|v| v.contains("exchange_rate")));
        assert!(violations.iter().any(|v| v.contains("description")));
        assert!(violations.iter().any(|v| v.contains("metadata cannot have")));
    }

    #[test]
    fn test_metadata_key_and_value_ceilings() {
        let long_key = "k".repeat(MAX_METADATA_KEY_LENGTH + 1);
        let mut req = request(TransactionType::Deposit, 100);
        req.metadata = Some(BTreeMap::from([
            (String::new(), "v".to_string()),
            (long_key.clone(), "v".to_string()),
            ("note".to_string(), "x".repeat(MAX_METADATA_VALUE_LENGTH + 1)),
        ]));

        let violations = violations_of(engine().create(req, now()));
        assert_eq!(
            vec![
                "metadata key '' must be 1 to 64 characters".to_string(),
                format!("metadata key '{}' must be 1 to 64 characters", long_key),
                "metadata value for 'note' cannot exceed 500 characters".to_string(),
            ],
            violations
        );

        let mut req = request(TransactionType::Deposit, 100);
        req.metadata = Some(BTreeMap::from([(
            "k".repeat(MAX_METADATA_KEY_LENGTH),
            "x".repeat(MAX_METADATA_VALUE_LENGTH),
        )]));
        assert!(engine().create(req, now()).is_ok());
    }

    #[test]
    fn test_create_rejects_unrepresentable_default_expiry() {
        let engine = TransactionEngine::new(
            Arc::new(CurrencyRegistry::default()),
            Duration::days(365 * 300_000),
        );
        let violations =
            violations_of(engine.create(request(TransactionType::Deposit, 100), now()));
        assert_eq!(vec!["default expiry is out of range".to_string()], violations);
    }

    #[test]
    fn test_amount_bounds() {
        let violations =
            violations_of(engine().create(request(TransactionType::Deposit, 0), now()));
        assert!(violations.contains(&"amount must be positive".to_string()));

        let violations = violations_of(engine().create(
            request(TransactionType::Deposit, MAX_TRANSACTION_AMOUNT + 1),
            now(),
        ));
        assert!(violations[0].contains("cannot exceed"));

        assert!(
            engine()
                .create(request(TransactionType::Deposit, MAX_TRANSACTION_AMOUNT), now())
                .is_ok()
        );
    }

    #[test]
    fn test_happy_path_to_refund() {
        let mut tx = pending(TransactionType::Payment);
        let t1 = now() + Duration::seconds(1);
        let t2 = now() + Duration::seconds(2);
        let t3 = now() + Duration::seconds(3);

        tx.start_processing(t1).unwrap();
        assert_eq!(Some(t1), tx.processed_at());

        tx.complete(Some("approved".to_string()), t2).unwrap();
        assert_eq!(TransactionStatus::Completed, tx.status());
        assert_eq!(Some(t2), tx.completed_at());
        assert_eq!(None, tx.expires_at());
        assert_eq!(Some("approved"), tx.processor_response());
        assert_eq!(tx.amount() - tx.fee_amount(), tx.net_amount());

        tx.refund(t3).unwrap();
        assert_eq!(TransactionStatus::Refunded, tx.status());
        assert_eq!(t3, tx.updated_at());
    }

    #[test]
    fn test_invalid_transition_leaves_transaction_unchanged() {
        let mut tx = pending(TransactionType::Deposit);
        tx.start_processing(now()).unwrap();
        tx.complete(None, now()).unwrap();
        let before = tx.clone();

        assert_eq!(
            Err(LedgerError::InvalidTransition {
                from: TransactionStatus::Completed,
                to: TransactionStatus::Processing,
            }),
            tx.start_processing(now())
        );
        assert_eq!(before, tx);

        assert!(tx.cancel(now()).is_err());
        assert!(tx.expire(now()).is_err());
        assert_eq!(before, tx);
    }

    #[test]
    fn test_fail_requires_reason() {
        let mut tx = pending(TransactionType::Withdrawal);
        tx.start_processing(now()).unwrap();
        let before = tx.clone();

        assert!(matches!(tx.fail("   ", now()), Err(LedgerError::Validation(_))));
        assert_eq!(before, tx);

        tx.fail("card declined", now()).unwrap();
        assert_eq!(TransactionStatus::Failed, tx.status());
        assert_eq!(Some("card declined"), tx.failure_reason());
        assert!(tx.processed_at().is_some());
    }

    #[test]
    fn test_fail_from_pending_is_rejected() {
        let mut tx = pending(TransactionType::Withdrawal);
        assert_eq!(
            Err(LedgerError::InvalidTransition {
                from: TransactionStatus::Pending,
                to: TransactionStatus::Failed,
            }),
            tx.fail("nope", now())
        );
    }

    #[test]
    fn test_expire_rejects_premature_call() {
        let mut tx = pending(TransactionType::Deposit);
        let before = tx.clone();
        let expires_at = now() + Duration::hours(24);

        assert_eq!(
            Err(LedgerError::PrematureExpiry { expires_at }),
            tx.expire(now())
        );
        assert_eq!(before, tx);

        let later = expires_at + Duration::seconds(1);
        tx.expire(later).unwrap();
        assert_eq!(TransactionStatus::Expired, tx.status());
        assert_eq!(Some(expires_at), tx.expires_at());
    }

    #[test]
    fn test_expire_stamps_missing_expiry() {
        let mut tx = pending(TransactionType::Deposit);
        tx.expires_at = None;

        tx.expire(now()).unwrap();
        assert_eq!(Some(now()), tx.expires_at());
        assert_eq!(Ok(()), tx.validate_at(now()));
    }

    #[test]
    fn test_is_due_for_expiry() {
        let tx = pending(TransactionType::Deposit);
        assert!(!tx.is_due_for_expiry(now()));
        assert!(tx.is_due_for_expiry(now() + Duration::hours(25)));
    }

    #[test]
    fn test_status_rules_on_deserialized_records() {
        let mut tx = pending(TransactionType::Deposit);
        tx.status = TransactionStatus::Completed;
        let violations = tx.violations_at(now());
        assert_eq!(2, violations.len(), "{:?}", violations);

        tx.status = TransactionStatus::Refunded;
        assert_eq!(
            vec!["refunded transaction must have completed_at".to_string()],
            tx.violations_at(now())
        );
    }

    #[test]
    fn test_validate_against_wallet() {
        let ledger = WalletLedger::new(Arc::new(CurrencyRegistry::default()));
        let mut wallet = ledger
            .create(
                &CreateWalletRequest {
                    user_id: Uuid::new_v4(),
                    currency: "USD".to_string(),
                    is_primary: true,
                },
                now(),
            )
            .unwrap();
        wallet.update_limits(5_000, 50_000, now()).unwrap();
        wallet.credit(3_000, now()).unwrap();

        let mut req = request(TransactionType::Withdrawal, 2_000);
        req.wallet_id = wallet.id();
        let tx = engine().create(req.clone(), now()).unwrap();
        assert_eq!(Ok(()), tx.validate_against_wallet(&wallet));

        req.amount = 4_000;
        let tx = engine().create(req.clone(), now()).unwrap();
        assert_eq!(
            Err(LedgerError::InsufficientBalance {
                available: 3_000,
                requested: 4_000
            }),
            tx.validate_against_wallet(&wallet)
        );

        req.amount = 6_000;
        let tx = engine().create(req.clone(), now()).unwrap();
        assert_eq!(
            Err(LedgerError::AmountExceedsDailyLimit {
                limit: 5_000,
                requested: 6_000
            }),
            tx.validate_against_wallet(&wallet)
        );

        // Inbound money is not limited by the wallet.
        req.transaction_type = TransactionType::Deposit;
        let tx = engine().create(req.clone(), now()).unwrap();
        assert_eq!(Ok(()), tx.validate_against_wallet(&wallet));

        req.currency = "EUR".to_string();
        let tx = engine().create(req.clone(), now()).unwrap();
        assert_eq!(
            Err(LedgerError::CurrencyMismatch {
                expected: Currency::Usd,
                found: Currency::Eur
            }),
            tx.validate_against_wallet(&wallet)
        );

        req.wallet_id = Uuid::new_v4();
        let tx = engine().create(req, now()).unwrap();
        assert!(matches!(
            tx.validate_against_wallet(&wallet),
            Err(LedgerError::WalletMismatch { .. })
        ));
    }

    #[test]
    fn test_format_amount() {
        let tx = pending(TransactionType::Deposit);
        assert_eq!("$ 100.00", engine().format_amount(&tx).unwrap());
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut req = request(TransactionType::Transfer, 5_000);
        req.metadata = Some(BTreeMap::from([("chat_id".to_string(), "c-42".to_string())]));
        req.external_id = Some("ext-1".to_string());
        let tx = engine().create(req, now()).unwrap();

        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }
}
