//! Background task that expires stale pending transactions and lapsed
//! payment methods.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::{services::payment_method_validator::PaymentMethodValidator, store::LedgerStore};

/// Spawn the sweeper. It ticks every `interval` until the runtime shuts down.
pub fn spawn(
    store: Arc<LedgerStore>,
    validator: Arc<PaymentMethodValidator>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep(&store, &validator).await;
        }
    })
}

/// One pass over the store. Returns how many entities were expired.
pub async fn sweep(store: &LedgerStore, validator: &PaymentMethodValidator) -> usize {
    let now = Utc::now();

    let transactions = store.expire_due_transactions(now).await;
    if !transactions.is_empty() {
        tracing::info!(count = transactions.len(), "expired pending transactions");
    }

    let payment_methods = store.expire_due_payment_methods(validator, now).await;
    if !payment_methods.is_empty() {
        tracing::info!(count = payment_methods.len(), "expired lapsed payment methods");
    }

    transactions.len() + payment_methods.len()
}
