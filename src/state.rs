//! Shared application state handed to every HTTP handler.

use std::sync::Arc;

use crate::{
    config::Config,
    services::{
        currency_registry::CurrencyRegistry,
        payment_method_validator::PaymentMethodValidator,
        transaction_engine::TransactionEngine,
        wallet_ledger::WalletLedger,
    },
    store::LedgerStore,
};

/// Store plus the domain services, all sharing one currency registry.
///
/// Cloning is cheap; everything heavy sits behind an `Arc`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<LedgerStore>,
    pub registry: Arc<CurrencyRegistry>,
    pub wallets: WalletLedger,
    pub transactions: TransactionEngine,
    pub payment_methods: Arc<PaymentMethodValidator>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(CurrencyRegistry::default());

        Self {
            store: Arc::new(LedgerStore::new()),
            wallets: WalletLedger::new(Arc::clone(&registry)),
            transactions: TransactionEngine::new(
                Arc::clone(&registry),
                config.transaction_expiry(),
            ),
            payment_methods: Arc::new(PaymentMethodValidator::with_default_matrix(
                Arc::clone(&registry),
                config.unknown_provider_policy(),
            )),
            registry,
        }
    }
}
