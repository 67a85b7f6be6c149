use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::paystack_handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(payments_health))

        // Client-side flow: initialize, then verify after the redirect
        .route("/initialize", post(paystack_handlers::initialize_payment))
        .route("/verify", post(paystack_handlers::verify_payment))

        // Server-to-server push from Paystack
        .route("/webhook", post(paystack_handlers::paystack_webhook))
}

async fn payments_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "payments",
        "timestamp": Utc::now().to_rfc3339(),
        "features": ["initialize", "verify", "webhook"]
    }))
}
