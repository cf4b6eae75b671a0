//! Payment method HTTP handlers.
//!
//! - POST /api/v1/payment-methods - Link a payment method
//! - GET /api/v1/payment-methods/{id} - Public view
//! - GET /internal/v1/payment-methods/{id} - Security, provider and usage details
//! - POST /api/v1/payment-methods/{id}/verify|block|activate|deactivate|default|usage|security

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, LedgerError},
    models::payment_method::{
        BlockRequest, CreatePaymentMethodRequest, PaymentMethod, PaymentMethodDetails,
        PaymentMethodResponse, SecurityUpdateRequest, SetDefaultRequest, UsageRequest,
    },
    services::payment_method_validator::PaymentMethodValidator,
    state::AppState,
};

/// Link a payment method. It starts out Pending until verified.
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": "550e8400-...",
///   "method_type": "e_wallet",
///   "provider": "gcash",
///   "currency": "PHP",
///   "country": "PH",
///   "metadata": { "phone_number": "+639171234567" }
/// }
/// ```
pub async fn create_payment_method(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentMethodRequest>,
) -> Result<(StatusCode, Json<PaymentMethodResponse>), AppError> {
    let now = Utc::now();
    let payment_method = state.payment_methods.before_create(request, now)?;
    let payment_method = state
        .store
        .insert_payment_method(payment_method, now)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PaymentMethodResponse::from(&payment_method)),
    ))
}

pub async fn get_payment_method(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    let payment_method = state.store.payment_method(id).await?;
    Ok(Json(PaymentMethodResponse::from(&payment_method)))
}

/// Privileged view including security info, provider data and usage.
pub async fn get_payment_method_internal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethodDetails>, AppError> {
    let payment_method = state.store.payment_method(id).await?;
    Ok(Json(PaymentMethodDetails::from(&payment_method)))
}

/// Run a validator operation against the stored payment method.
async fn apply<F>(
    state: &AppState,
    id: Uuid,
    op: F,
) -> Result<Json<PaymentMethodResponse>, AppError>
where
    F: FnOnce(&PaymentMethodValidator, &mut PaymentMethod) -> Result<(), LedgerError>,
{
    let validator: &PaymentMethodValidator = &state.payment_methods;
    let payment_method = state
        .store
        .update_payment_method(id, |pm| {
            op(validator, pm)?;
            Ok(pm.clone())
        })
        .await?;
    Ok(Json(PaymentMethodResponse::from(&payment_method)))
}

pub async fn verify(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    apply(&state, id, |v, pm| v.verify(pm, Utc::now())).await
}

/// Block the payment method for fraud.
///
/// # Request Body
///
/// ```json
/// { "reason": "chargeback ring" }
/// ```
pub async fn block(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<BlockRequest>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    let response = apply(&state, id, |v, pm| v.block(pm, &request.reason, Utc::now())).await?;
    tracing::warn!(payment_method_id = %id, reason = %request.reason, "payment method blocked");
    Ok(response)
}

pub async fn activate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    apply(&state, id, |v, pm| v.activate(pm, Utc::now())).await
}

pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    apply(&state, id, |v, pm| v.deactivate(pm, Utc::now())).await
}

/// Set or clear the default flag. Setting it demotes the user's other methods.
pub async fn set_default(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetDefaultRequest>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    let payment_method = state
        .store
        .set_default_payment_method(id, request.is_default, &state.payment_methods, Utc::now())
        .await?;
    Ok(Json(PaymentMethodResponse::from(&payment_method)))
}

/// Record one use of the payment method.
///
/// # Request Body
///
/// ```json
/// { "amount": 12500, "currency": "PHP", "success": true }
/// ```
pub async fn record_usage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UsageRequest>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    let currency = state.registry.parse(&request.currency)?;
    apply(&state, id, |v, pm| {
        v.mark_as_used(pm, request.amount, currency, request.success, Utc::now())
    })
    .await
}

/// Record a new risk assessment.
///
/// # Request Body
///
/// ```json
/// { "risk_score": 82, "three_ds_enrolled": true }
/// ```
pub async fn update_security(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SecurityUpdateRequest>,
) -> Result<Json<PaymentMethodResponse>, AppError> {
    apply(&state, id, |v, pm| {
        v.update_security_info(pm, &request, Utc::now())
    })
    .await
}
