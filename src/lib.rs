//! Wallet ledger and transaction lifecycle engine.
//!
//! # Components
//!
//! - **Currency registry**: supported currencies, precision, symbols, default limits
//! - **Wallet ledger**: balances, frozen funds, rolling daily/monthly limits
//! - **Transaction engine**: creation, validation and the status state machine
//! - **Payment method validator**: structural and security rules for linked instruments
//!
//! The components are synchronous and lock-free. [`store::LedgerStore`]
//! serializes access per entity and [`routes::router`] exposes everything
//! over HTTP.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
