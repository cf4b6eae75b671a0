//! HTTP surface tests, driving the router directly with `oneshot`.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use wallet_ledger::{config::Config, routes, state::AppState};

fn app() -> Router {
    let config = Config::from_iter(Vec::new()).unwrap();
    routes::router(AppState::new(&config))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn open_wallet(app: &Router, currency: &str, funds: i64) -> String {
    let (status, wallet) = send(
        app,
        "POST",
        "/api/v1/wallets",
        Some(json!({ "user_id": Uuid::new_v4(), "currency": currency })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, status, "{}", wallet);
    let id = wallet["id"].as_str().unwrap().to_string();

    if funds > 0 {
        let (status, _) = send(
            app,
            "POST",
            &format!("/api/v1/wallets/{}/credit", id),
            Some(json!({ "amount": funds })),
        )
        .await;
        assert_eq!(StatusCode::OK, status);
    }
    id
}

#[tokio::test]
async fn health_lists_currencies() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("healthy", body["status"]);
    assert_eq!(11, body["currencies"].as_array().unwrap().len());
}

#[tokio::test]
async fn wallet_funds_flow() {
    let app = app();
    let id = open_wallet(&app, "USD", 150_000).await;

    let (status, wallet) = send(&app, "GET", &format!("/api/v1/wallets/{}", id), None).await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("$ 1500.00", wallet["formatted_balance"]);
    assert_eq!(1_000_000, wallet["daily_limit"]);

    let (status, wallet) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{}/freeze-funds", id),
        Some(json!({ "amount": 100_000 })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(50_000, wallet["available_balance"]);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{}/debit", id),
        Some(json!({ "amount": 60_000 })),
    )
    .await;
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
    assert_eq!("insufficient_balance", body["error"]["code"]);

    let (status, wallet) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{}/debit", id),
        Some(json!({ "amount": 50_000 })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(100_000, wallet["balance"]);
    assert_eq!(50_000, wallet["used_this_day"]);
}

#[tokio::test]
async fn closing_requires_empty_wallet() {
    let app = app();
    let id = open_wallet(&app, "IDR", 5_000).await;
    let status_uri = format!("/api/v1/wallets/{}/status", id);

    let (status, body) = send(&app, "POST", &status_uri, Some(json!({ "action": "close" }))).await;
    assert_eq!(StatusCode::CONFLICT, status);
    assert_eq!("invalid_state", body["error"]["code"]);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/wallets/{}/debit", id),
        Some(json!({ "amount": 5_000 })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);

    let (status, wallet) =
        send(&app, "POST", &status_uri, Some(json!({ "action": "close" }))).await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("closed", wallet["status"]);
    assert_eq!("Rp 0", wallet["formatted_balance"]);
}

#[tokio::test]
async fn unknown_wallet_is_404() {
    let app = app();
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/wallets/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(StatusCode::NOT_FOUND, status);
    assert_eq!("wallet_not_found", body["error"]["code"]);
}

#[tokio::test]
async fn transaction_lifecycle() {
    let app = app();
    let wallet_id = open_wallet(&app, "USD", 10_000).await;

    let (status, tx) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "counterparty_id": Uuid::new_v4(),
            "transaction_type": "payment",
            "currency": "USD",
            "amount": 2_500,
            "fee_amount": 100,
            "metadata": { "order": "A-17" },
            "external_id": "psp-991"
        })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, status, "{}", tx);
    assert_eq!("pending", tx["status"]);
    assert_eq!(2_400, tx["net_amount"]);
    assert_eq!("$ 25.00", tx["formatted_amount"]);
    assert!(tx["reference"].as_str().unwrap().starts_with("PAY"));
    assert!(tx.get("metadata").is_none());
    let id = tx["id"].as_str().unwrap().to_string();

    let (_, full) = send(&app, "GET", &format!("/internal/v1/transactions/{}", id), None).await;
    assert_eq!("A-17", full["metadata"]["order"]);
    assert_eq!("psp-991", full["external_id"]);

    let (status, body) =
        send(&app, "POST", &format!("/api/v1/transactions/{}/refund", id), None).await;
    assert_eq!(StatusCode::CONFLICT, status);
    assert_eq!("invalid transition from pending to refunded", body["error"]["message"]);

    let (status, body) =
        send(&app, "POST", &format!("/api/v1/transactions/{}/expire", id), None).await;
    assert_eq!(StatusCode::CONFLICT, status);
    assert_eq!("invalid_transition", body["error"]["code"]);

    let (status, _) =
        send(&app, "POST", &format!("/api/v1/transactions/{}/process", id), None).await;
    assert_eq!(StatusCode::OK, status);

    let (status, tx) = send(
        &app,
        "POST",
        &format!("/api/v1/transactions/{}/complete", id),
        Some(json!({ "processor_response": "approved" })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("completed", tx["status"]);
    assert!(tx["expires_at"].is_null());

    let (status, tx) =
        send(&app, "POST", &format!("/api/v1/transactions/{}/refund", id), None).await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("refunded", tx["status"]);
}

#[tokio::test]
async fn transaction_validation_is_aggregated() {
    let app = app();
    let wallet_id = open_wallet(&app, "USD", 0).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "transaction_type": "transfer",
            "currency": "USD",
            "amount": 100,
            "fee_amount": 150,
            "exchange_rate": 0.0
        })),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert_eq!("validation_failed", body["error"]["code"]);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.contains("fee_amount must be less than amount"), "{}", message);
    assert!(message.contains("exchange_rate must be positive"), "{}", message);
    assert!(message.contains("counterparty_id is required"), "{}", message);
}

#[tokio::test]
async fn outbound_transaction_needs_funds() {
    let app = app();
    let wallet_id = open_wallet(&app, "EUR", 1_000).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "transaction_type": "withdrawal",
            "currency": "EUR",
            "amount": 5_000
        })),
    )
    .await;
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
    assert_eq!("insufficient_balance", body["error"]["code"]);

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/transactions",
        Some(json!({
            "wallet_id": wallet_id,
            "transaction_type": "deposit",
            "currency": "USD",
            "amount": 5_000
        })),
    )
    .await;
    assert_eq!(StatusCode::UNPROCESSABLE_ENTITY, status);
    assert_eq!("currency_mismatch", body["error"]["code"]);
}

#[tokio::test]
async fn payment_method_lifecycle() {
    let app = app();
    let user_id = Uuid::new_v4();

    let (status, pm) = send(
        &app,
        "POST",
        "/api/v1/payment-methods",
        Some(json!({
            "user_id": user_id,
            "method_type": "e_wallet",
            "provider": "gcash",
            "currency": "PHP",
            "country": "PH",
            "metadata": { "phone_number": "+639171234567" },
            "provider_data": { "token": "tok_secret" }
        })),
    )
    .await;
    assert_eq!(StatusCode::CREATED, status, "{}", pm);
    assert_eq!("pending", pm["status"]);
    assert_eq!("GCash e-wallet", pm["display_name"]);
    assert!(pm.get("provider_data").is_none());
    let id = pm["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/payment-methods/{}/usage", id),
        Some(json!({ "amount": 100, "currency": "PHP", "success": true })),
    )
    .await;
    assert_eq!(StatusCode::CONFLICT, status);

    let (status, pm) =
        send(&app, "POST", &format!("/api/v1/payment-methods/{}/verify", id), None).await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("active", pm["status"]);
    assert_eq!(true, pm["is_verified"]);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/payment-methods/{}/usage", id),
        Some(json!({ "amount": 12_500, "currency": "PHP", "success": true })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/v1/payment-methods/{}/security", id),
        Some(json!({ "risk_score": 82 })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);

    let (_, details) =
        send(&app, "GET", &format!("/internal/v1/payment-methods/{}", id), None).await;
    assert_eq!("tok_secret", details["provider_data"]["token"]);
    assert_eq!("high", details["security_info"]["security_level"]);
    assert_eq!(12_500, details["usage_stats"]["total_amount"]);
    assert_eq!(100.0, details["success_rate"]);

    let (status, pm) = send(
        &app,
        "POST",
        &format!("/api/v1/payment-methods/{}/block", id),
        Some(json!({ "reason": "account takeover" })),
    )
    .await;
    assert_eq!(StatusCode::OK, status);
    assert_eq!("blocked", pm["status"]);

    let (status, body) =
        send(&app, "POST", &format!("/api/v1/payment-methods/{}/activate", id), None).await;
    assert_eq!(StatusCode::CONFLICT, status);
    assert_eq!("invalid_transition", body["error"]["code"]);
}

#[tokio::test]
async fn card_with_bad_last_four_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/payment-methods",
        Some(json!({
            "user_id": Uuid::new_v4(),
            "method_type": "debit_card",
            "provider": "visa",
            "currency": "SGD",
            "country": "SG",
            "last_four": "12a4",
            "expiry_month": 12,
            "expiry_year": 2030
        })),
    )
    .await;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    assert!(
        body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("last_four must be exactly 4 digits")
    );
}
