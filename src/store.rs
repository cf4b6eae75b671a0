//! In-memory ledger storage.
//!
//! Every entity lives behind its own `tokio::sync::Mutex`, so mutations of
//! one wallet, transaction or payment method are serialized while
//! unrelated entities proceed in parallel. The maps themselves sit behind
//! `RwLock`s and are only write-locked to insert.
//!
//! The store is also where the per-user uniqueness rules live: at most one
//! primary wallet and one default payment method per user.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    error::{AppError, LedgerError},
    models::{
        payment_method::{PaymentMethod, PaymentMethodStatus},
        transaction::Transaction,
        wallet::Wallet,
    },
    services::payment_method_validator::PaymentMethodValidator,
};

type Table<T> = RwLock<HashMap<Uuid, Arc<Mutex<T>>>>;

#[derive(Debug, Default)]
pub struct LedgerStore {
    wallets: Table<Wallet>,
    transactions: Table<Transaction>,
    payment_methods: Table<PaymentMethod>,
    /// Held while primary/default flags are reassigned across a user's entities.
    flags: Mutex<()>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new wallet. A primary wallet demotes the user's other ones.
    pub async fn insert_wallet(
        &self,
        wallet: Wallet,
        now: DateTime<Utc>,
    ) -> Result<Wallet, AppError> {
        let _flags = self.flags.lock().await;
        if wallet.is_primary() {
            self.demote_primary_wallets(wallet.user_id(), wallet.id(), now)
                .await?;
        }

        let snapshot = wallet.clone();
        self.wallets
            .write()
            .await
            .insert(wallet.id(), Arc::new(Mutex::new(wallet)));

        tracing::info!(
            wallet_id = %snapshot.id(),
            user_id = %snapshot.user_id(),
            currency = %snapshot.currency(),
            "wallet created"
        );
        Ok(snapshot)
    }

    pub async fn wallet(&self, id: Uuid) -> Result<Wallet, AppError> {
        let entry = self.wallet_entry(id).await?;
        let wallet = entry.lock().await;
        Ok(wallet.clone())
    }

    /// Run `change` against the locked wallet.
    pub async fn update_wallet<F, T>(&self, id: Uuid, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Wallet) -> Result<T, LedgerError>,
    {
        let entry = self.wallet_entry(id).await?;
        let mut wallet = entry.lock().await;
        Ok(change(&mut *wallet)?)
    }

    /// Set or clear the primary flag, demoting the user's other wallets when set.
    pub async fn set_primary_wallet(
        &self,
        id: Uuid,
        is_primary: bool,
        now: DateTime<Utc>,
    ) -> Result<Wallet, AppError> {
        let _flags = self.flags.lock().await;
        let wallet = self
            .update_wallet(id, |w| {
                w.set_primary(is_primary, now)?;
                Ok(w.clone())
            })
            .await?;

        if is_primary {
            self.demote_primary_wallets(wallet.user_id(), id, now)
                .await?;
        }
        Ok(wallet)
    }

    /// Caller holds `flags`.
    async fn demote_primary_wallets(
        &self,
        user_id: Uuid,
        keep: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let entries: Vec<_> = self
            .wallets
            .read()
            .await
            .iter()
            .filter(|(id, _)| **id != keep)
            .map(|(_, entry)| Arc::clone(entry))
            .collect();

        for entry in entries {
            let mut wallet = entry.lock().await;
            if wallet.user_id() == user_id && wallet.is_primary() {
                wallet.set_primary(false, now)?;
                tracing::info!(
                    wallet_id = %wallet.id(),
                    "primary flag moved to another wallet"
                );
            }
        }
        Ok(())
    }

    async fn wallet_entry(&self, id: Uuid) -> Result<Arc<Mutex<Wallet>>, AppError> {
        self.wallets
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::WalletNotFound)
    }

    /// Store a new transaction after checking it against its wallet.
    ///
    /// The wallet stays locked for the check, so the balance and limits it
    /// sees are current.
    pub async fn create_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<Transaction, AppError> {
        let entry = self.wallet_entry(transaction.wallet_id()).await?;
        let wallet = entry.lock().await;
        transaction.validate_against_wallet(&*wallet)?;

        let snapshot = transaction.clone();
        self.transactions
            .write()
            .await
            .insert(transaction.id(), Arc::new(Mutex::new(transaction)));
        drop(wallet);

        tracing::info!(
            transaction_id = %snapshot.id(),
            wallet_id = %snapshot.wallet_id(),
            reference = snapshot.reference(),
            "transaction created"
        );
        Ok(snapshot)
    }

    pub async fn transaction(&self, id: Uuid) -> Result<Transaction, AppError> {
        let entry = self.transaction_entry(id).await?;
        let transaction = entry.lock().await;
        Ok(transaction.clone())
    }

    /// Run `change` against the locked transaction.
    pub async fn update_transaction<F, T>(&self, id: Uuid, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Transaction) -> Result<T, LedgerError>,
    {
        let entry = self.transaction_entry(id).await?;
        let mut transaction = entry.lock().await;
        Ok(change(&mut *transaction)?)
    }

    /// Expire every pending transaction whose expiry is before `now`.
    ///
    /// Each candidate is re-checked under its own lock; one that moved on in
    /// the meantime is rejected by the state machine and skipped.
    pub async fn expire_due_transactions(&self, now: DateTime<Utc>) -> Vec<Uuid> {
        let entries: Vec<_> = self.transactions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for entry in entries {
            let mut transaction = entry.lock().await;
            if !transaction.is_due_for_expiry(now) {
                continue;
            }
            match transaction.expire(now) {
                Ok(()) => expired.push(transaction.id()),
                Err(err) => {
                    tracing::warn!(
                        transaction_id = %transaction.id(),
                        error = %err,
                        "could not expire transaction"
                    );
                }
            }
        }
        expired
    }

    async fn transaction_entry(&self, id: Uuid) -> Result<Arc<Mutex<Transaction>>, AppError> {
        self.transactions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::TransactionNotFound)
    }

    /// Store a new payment method. An active default one demotes the
    /// user's others; a default that is not active is refused.
    pub async fn insert_payment_method(
        &self,
        payment_method: PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<PaymentMethod, AppError> {
        let _flags = self.flags.lock().await;
        if payment_method.is_default {
            if payment_method.status != PaymentMethodStatus::Active {
                return Err(LedgerError::PaymentMethodNotActive(payment_method.status).into());
            }
            self.demote_default_payment_methods(payment_method.user_id, payment_method.id, now)
                .await;
        }

        let snapshot = payment_method.clone();
        self.payment_methods
            .write()
            .await
            .insert(payment_method.id, Arc::new(Mutex::new(payment_method)));

        tracing::info!(
            payment_method_id = %snapshot.id,
            user_id = %snapshot.user_id,
            method_type = %snapshot.method_type,
            provider = %snapshot.provider,
            "payment method linked"
        );
        Ok(snapshot)
    }

    pub async fn payment_method(&self, id: Uuid) -> Result<PaymentMethod, AppError> {
        let entry = self.payment_method_entry(id).await?;
        let payment_method = entry.lock().await;
        Ok(payment_method.clone())
    }

    /// Run `change` against the locked payment method.
    pub async fn update_payment_method<F, T>(&self, id: Uuid, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut PaymentMethod) -> Result<T, LedgerError>,
    {
        let entry = self.payment_method_entry(id).await?;
        let mut payment_method = entry.lock().await;
        Ok(change(&mut *payment_method)?)
    }

    /// Set or clear the default flag, demoting the user's other methods when set.
    pub async fn set_default_payment_method(
        &self,
        id: Uuid,
        is_default: bool,
        validator: &PaymentMethodValidator,
        now: DateTime<Utc>,
    ) -> Result<PaymentMethod, AppError> {
        let _flags = self.flags.lock().await;
        let payment_method = self
            .update_payment_method(id, |pm| {
                validator.set_default(pm, is_default, now)?;
                Ok(pm.clone())
            })
            .await?;

        if is_default {
            self.demote_default_payment_methods(payment_method.user_id, id, now)
                .await;
        }
        Ok(payment_method)
    }

    /// Caller holds `flags`. Clearing the flag never invalidates a method,
    /// so it is applied directly.
    async fn demote_default_payment_methods(&self, user_id: Uuid, keep: Uuid, now: DateTime<Utc>) {
        let entries: Vec<_> = self
            .payment_methods
            .read()
            .await
            .iter()
            .filter(|(id, _)| **id != keep)
            .map(|(_, entry)| Arc::clone(entry))
            .collect();

        for entry in entries {
            let mut payment_method = entry.lock().await;
            if payment_method.user_id == user_id && payment_method.is_default {
                payment_method.is_default = false;
                payment_method.updated_at = now;
                tracing::info!(
                    payment_method_id = %payment_method.id,
                    "default flag moved to another payment method"
                );
            }
        }
    }

    /// Move every live payment method whose expiry has passed to Expired.
    pub async fn expire_due_payment_methods(
        &self,
        validator: &PaymentMethodValidator,
        now: DateTime<Utc>,
    ) -> Vec<Uuid> {
        let entries: Vec<_> = self.payment_methods.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for entry in entries {
            let mut payment_method = entry.lock().await;
            match validator.refresh_expiry(&mut *payment_method, now) {
                Ok(true) => expired.push(payment_method.id),
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        payment_method_id = %payment_method.id,
                        error = %err,
                        "could not expire payment method"
                    );
                }
            }
        }
        expired
    }

    async fn payment_method_entry(&self, id: Uuid) -> Result<Arc<Mutex<PaymentMethod>>, AppError> {
        self.payment_methods
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AppError::PaymentMethodNotFound)
    }
}
