//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{models::currency::Currency, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,

    /// Currencies wallets can currently be opened in
    pub currencies: Vec<Currency>,

    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "currencies": ["USD", "EUR", "IDR"],
///   "timestamp": "2026-10-16T09:30:00Z"
/// }
/// ```
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let currencies = Currency::ALL
        .into_iter()
        .filter(|c| state.registry.is_supported(*c))
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        currencies,
        timestamp: Utc::now(),
    })
}
