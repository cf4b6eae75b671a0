//! Data models: ledger entities, request bodies and response projections.

/// Supported currency codes
pub mod currency;
/// Linked payment instruments
pub mod payment_method;
/// Money-movement records and their state machine
pub mod transaction;
/// Wallet balances and limits
pub mod wallet;
