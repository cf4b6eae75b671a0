//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Extracts the path id and JSON body
//! 2. Runs the domain operation against the locked entity in the store
//! 3. Returns the public or privileged projection as JSON

/// Health check endpoint
pub mod health;
/// Payment method endpoints
pub mod payment_methods;
/// Transaction lifecycle endpoints
pub mod transactions;
/// Wallet endpoints
pub mod wallets;
