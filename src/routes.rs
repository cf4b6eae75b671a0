//! Route table.

use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{health, payment_methods, transactions, wallets},
    state::AppState,
};

/// Build the HTTP router.
///
/// `/api/v1` serves public projections; `/internal/v1` serves the full
/// records and is meant to sit behind the deployment's own access control.
pub fn router(state: AppState) -> Router {
    let wallet_routes = Router::new()
        .route("/api/v1/wallets", post(wallets::create_wallet))
        .route("/api/v1/wallets/{id}", get(wallets::get_wallet))
        .route("/api/v1/wallets/{id}/credit", post(wallets::credit))
        .route("/api/v1/wallets/{id}/debit", post(wallets::debit))
        .route("/api/v1/wallets/{id}/freeze-funds", post(wallets::freeze_funds))
        .route(
            "/api/v1/wallets/{id}/unfreeze-funds",
            post(wallets::unfreeze_funds),
        )
        .route("/api/v1/wallets/{id}/status", post(wallets::update_status))
        .route("/api/v1/wallets/{id}/limits", post(wallets::update_limits))
        .route("/api/v1/wallets/{id}/primary", post(wallets::set_primary))
        .route(
            "/internal/v1/wallets/{id}",
            get(wallets::get_wallet_internal),
        );

    let transaction_routes = Router::new()
        .route(
            "/api/v1/transactions",
            post(transactions::create_transaction),
        )
        .route(
            "/api/v1/transactions/{id}",
            get(transactions::get_transaction),
        )
        .route(
            "/api/v1/transactions/{id}/process",
            post(transactions::process),
        )
        .route(
            "/api/v1/transactions/{id}/complete",
            post(transactions::complete),
        )
        .route("/api/v1/transactions/{id}/fail", post(transactions::fail))
        .route(
            "/api/v1/transactions/{id}/cancel",
            post(transactions::cancel),
        )
        .route(
            "/api/v1/transactions/{id}/expire",
            post(transactions::expire),
        )
        .route(
            "/api/v1/transactions/{id}/refund",
            post(transactions::refund),
        )
        .route(
            "/internal/v1/transactions/{id}",
            get(transactions::get_transaction_internal),
        );

    let payment_method_routes = Router::new()
        .route(
            "/api/v1/payment-methods",
            post(payment_methods::create_payment_method),
        )
        .route(
            "/api/v1/payment-methods/{id}",
            get(payment_methods::get_payment_method),
        )
        .route(
            "/api/v1/payment-methods/{id}/verify",
            post(payment_methods::verify),
        )
        .route(
            "/api/v1/payment-methods/{id}/block",
            post(payment_methods::block),
        )
        .route(
            "/api/v1/payment-methods/{id}/activate",
            post(payment_methods::activate),
        )
        .route(
            "/api/v1/payment-methods/{id}/deactivate",
            post(payment_methods::deactivate),
        )
        .route(
            "/api/v1/payment-methods/{id}/default",
            post(payment_methods::set_default),
        )
        .route(
            "/api/v1/payment-methods/{id}/usage",
            post(payment_methods::record_usage),
        )
        .route(
            "/api/v1/payment-methods/{id}/security",
            post(payment_methods::update_security),
        )
        .route(
            "/internal/v1/payment-methods/{id}",
            get(payment_methods::get_payment_method_internal),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(wallet_routes)
        .merge(transaction_routes)
        .merge(payment_method_routes)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
