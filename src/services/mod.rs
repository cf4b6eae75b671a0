//! Business logic services.
//!
//! Services hold the ledger rules and are separate from HTTP handlers.
//! None of them perform I/O or locking; the store serializes access.

pub mod currency_registry;
pub mod expiry_sweeper;
pub mod payment_method_validator;
pub mod transaction_engine;
pub mod wallet_ledger;
