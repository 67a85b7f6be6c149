// handlers/paystack_handlers.rs
//
// Payment confirmation is reconciled from two independent entry points:
// the client-side verify call after the Paystack redirect, and the
// charge.success webhook Paystack pushes on its own. Both can fire for
// the same transaction, in either order, so every write below is a pure
// field overwrite keyed by the transaction reference.
use axum::{
    body::Bytes,
    extract::{Json, State},
    http::HeaderMap,
};
use chrono::Utc;
use mongodb::bson::{self, doc, Document};
use mongodb::{Collection, Database};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::errors::{AppError, Result};
use crate::models::applicant::Application;
use crate::models::payment::{
    kobo_to_naira, naira_to_kobo, InitializePaymentRequest, InitializePaymentResponse,
    PaymentRecord, VerifyPaymentRequest, WebhookEvent,
};
use crate::services::email_service::EmailService;
use crate::state::AppState;

pub async fn initialize_payment(
    State(state): State<AppState>,
    Json(payload): Json<InitializePaymentRequest>,
) -> Result<Json<InitializePaymentResponse>> {
    let email = payload
        .email
        .ok_or_else(|| AppError::invalid_data("email is required"))?;
    let amount = payload
        .amount
        .ok_or_else(|| AppError::invalid_data("amount is required"))?;
    let prospective_id = payload
        .prospective_id
        .ok_or_else(|| AppError::invalid_data("prospectiveId is required"))?;
    let payment_type = payload
        .payment_type
        .ok_or_else(|| AppError::invalid_data("paymentType is required"))?;

    if amount <= 0.0 {
        return Err(AppError::invalid_data("amount must be greater than 0"));
    }

    let paystack = match &state.paystack_service {
        Some(service) => service.clone(),
        None => {
            return Err(AppError::ServiceUnavailable(
                "Paystack service is not available".into(),
            ))
        }
    };

    // Metadata travels with the transaction so the webhook can be
    // correlated back to the applicant later
    let metadata = json!({
        "prospective_id": &prospective_id,
        "payment_type": &payment_type,
    });

    let data = paystack
        .initialize_transaction(&email, naira_to_kobo(amount), metadata)
        .await?;

    let record = PaymentRecord {
        id: None,
        reference: data.reference.clone(),
        prospective_id: prospective_id.clone(),
        email,
        amount,
        payment_type,
        status: "initialized".to_string(),
        paid_at: None,
        channel: None,
        currency: None,
        fees: None,
        webhook_received: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let payments: Collection<PaymentRecord> = state.db.collection("payments");
    payments.insert_one(&record).await?;

    info!(
        "Payment initialized for {}: {}",
        prospective_id, data.reference
    );

    Ok(Json(InitializePaymentResponse {
        success: true,
        authorization_url: data.authorization_url,
        access_code: data.access_code,
        reference: data.reference,
    }))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>> {
    let reference = payload
        .reference
        .ok_or_else(|| AppError::invalid_data("reference is required"))?;
    let prospective_id = payload
        .prospective_id
        .ok_or_else(|| AppError::invalid_data("prospectiveId is required"))?;
    let email = payload
        .email
        .ok_or_else(|| AppError::invalid_data("email is required"))?;
    if payload.amount.is_none() {
        return Err(AppError::invalid_data("amount is required"));
    }

    let paystack = match &state.paystack_service {
        Some(service) => service.clone(),
        None => {
            return Err(AppError::ServiceUnavailable(
                "Paystack service is not available".into(),
            ))
        }
    };

    let data = paystack.verify_transaction(&reference).await?;

    if data.status != "success" {
        info!(
            "Transaction {} not successful, provider says: {}",
            reference, data.status
        );
        return Err(AppError::PaymentNotSuccessful(
            data.gateway_response.unwrap_or(data.status),
        ));
    }

    let confirmation = PaymentConfirmation {
        reference,
        prospective_id: prospective_id.clone(),
        amount_naira: kobo_to_naira(data.amount),
        paid_at: data.paid_at,
        channel: data.channel,
        currency: data.currency,
        fees_naira: data.fees.map(kobo_to_naira),
        via_webhook: false,
    };

    let newly_confirmed = apply_payment_confirmation(&state.db, &confirmation).await?;

    if newly_confirmed {
        send_receipt_email(&state, &prospective_id, &email, &confirmation).await;
    }

    Ok(Json(json!({
        "success": true,
        "message": "Payment verified successfully",
        "transaction": {
            "reference": confirmation.reference,
            "amount": confirmation.amount_naira,
            "status": "success",
            "paidAt": confirmation.paid_at,
            "channel": confirmation.channel,
        }
    })))
}

pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let paystack = match &state.paystack_service {
        Some(service) => service.clone(),
        None => {
            error!("Webhook received but Paystack service is not configured");
            return Err(AppError::ServiceUnavailable(
                "Paystack service is not available".into(),
            ));
        }
    };

    // The signature over the raw body is the only thing standing between
    // this endpoint and a forged event
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::AuthError)?;

    if !paystack.validate_webhook_signature(&body, signature) {
        warn!("Invalid Paystack webhook signature received");
        return Err(AppError::AuthError);
    }

    let event_value: Value = serde_json::from_slice(&body)?;
    let event_type = event_value
        .get("event")
        .and_then(|event| event.as_str())
        .unwrap_or_default()
        .to_string();

    // Acknowledge everything except charge.success; a non-2xx here would
    // make Paystack keep retrying events we never intend to handle
    if event_type != "charge.success" {
        info!("Ignoring Paystack event type: {}", event_type);
        return Ok(Json(json!({ "success": true })));
    }

    let event: WebhookEvent = serde_json::from_value(event_value)?;

    let payments: Collection<PaymentRecord> = state.db.collection("payments");
    let record = payments
        .find_one(doc! { "reference": &event.data.reference })
        .await?;

    let record = match record {
        Some(record) => record,
        None => {
            // Not a transaction this system initiated; ack and move on
            info!(
                "Webhook for unknown reference {}, ignoring",
                event.data.reference
            );
            return Ok(Json(json!({ "success": true })));
        }
    };

    let confirmation = PaymentConfirmation {
        reference: event.data.reference,
        prospective_id: record.prospective_id.clone(),
        amount_naira: kobo_to_naira(event.data.amount),
        paid_at: event.data.paid_at,
        channel: event.data.channel,
        currency: event.data.currency,
        fees_naira: event.data.fees.map(kobo_to_naira),
        via_webhook: true,
    };

    let newly_confirmed = apply_payment_confirmation(&state.db, &confirmation).await?;

    info!(
        "Webhook confirmed payment {} for {} (newly confirmed: {})",
        confirmation.reference, confirmation.prospective_id, newly_confirmed
    );

    if newly_confirmed {
        send_receipt_email(
            &state,
            &confirmation.prospective_id,
            &record.email,
            &confirmation,
        )
        .await;
    }

    Ok(Json(json!({ "success": true })))
}

// One confirmed charge, regardless of which path reported it
pub(crate) struct PaymentConfirmation {
    pub reference: String,
    pub prospective_id: String,
    pub amount_naira: f64,
    pub paid_at: Option<String>,
    pub channel: Option<String>,
    pub currency: Option<String>,
    pub fees_naira: Option<f64>,
    pub via_webhook: bool,
}

// $set document for the top-level payments entry. Overwrites only, no
// counters: replaying the same confirmation writes the same values.
pub(crate) fn payment_record_update(confirmation: &PaymentConfirmation) -> Document {
    let mut set = doc! {
        "status": "success",
        "amount": confirmation.amount_naira,
        "paid_at": confirmation.paid_at.clone(),
        "channel": confirmation.channel.clone(),
        "currency": confirmation.currency.clone(),
        "fees": confirmation.fees_naira,
        "updated_at": bson::DateTime::now(),
    };

    // Only the webhook path claims the flag; the verify path leaves
    // whatever the webhook may already have written
    if confirmation.via_webhook {
        set.insert("webhook_received", true);
    }

    set
}

// $set document for the application: summary fields plus the nested
// per-application copy of the payment record.
pub(crate) fn application_update(confirmation: &PaymentConfirmation) -> Document {
    doc! {
        "payment_status": "paid",
        "amount_paid": confirmation.amount_naira,
        "paystack_reference": confirmation.reference.clone(),
        "paid_at": confirmation.paid_at.clone(),
        "payment": {
            "reference": confirmation.reference.clone(),
            "amount": confirmation.amount_naira,
            "status": "success",
            "paid_at": confirmation.paid_at.clone(),
            "channel": confirmation.channel.clone(),
            "currency": confirmation.currency.clone(),
            "fees": confirmation.fees_naira,
        },
        "updated_at": bson::DateTime::now(),
    }
}

// Returns true when this call moved the record into "success" for the
// first time; replays return false so the receipt email stays single.
pub(crate) async fn apply_payment_confirmation(
    db: &Database,
    confirmation: &PaymentConfirmation,
) -> Result<bool> {
    let payments: Collection<PaymentRecord> = db.collection("payments");

    let previous = payments
        .find_one(doc! { "reference": &confirmation.reference })
        .await?;
    let already_successful = previous
        .map(|record| record.status == "success")
        .unwrap_or(false);

    payments
        .update_one(
            doc! { "reference": &confirmation.reference },
            doc! { "$set": payment_record_update(confirmation) },
        )
        .await?;

    let applications: Collection<Application> = db.collection("applications");
    applications
        .update_one(
            doc! { "prospective_id": &confirmation.prospective_id },
            doc! { "$set": application_update(confirmation) },
        )
        .await?;

    Ok(!already_successful)
}

// Best effort: a payment stays confirmed even when the receipt cannot
// be delivered.
async fn send_receipt_email(
    state: &AppState,
    prospective_id: &str,
    fallback_email: &str,
    confirmation: &PaymentConfirmation,
) {
    let email_service = match &state.email_service {
        Some(service) => service.clone(),
        None => return,
    };

    let applications: Collection<Application> = state.db.collection("applications");
    let (first_name, to) = match applications
        .find_one(doc! { "prospective_id": prospective_id })
        .await
    {
        Ok(Some(app)) => (app.first_name, app.email),
        _ => ("Applicant".to_string(), fallback_email.to_string()),
    };

    let html = EmailService::payment_receipt_html(
        &first_name,
        &confirmation.reference,
        confirmation.amount_naira,
        confirmation.paid_at.as_deref(),
    );

    if let Err(e) = email_service.send(&to, "Payment Confirmation", &html).await {
        error!(
            "Failed to send payment receipt for {}: {}",
            confirmation.reference, e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(via_webhook: bool) -> PaymentConfirmation {
        PaymentConfirmation {
            reference: "T123".to_string(),
            prospective_id: "SAUNI259001".to_string(),
            amount_naira: 5000.0,
            paid_at: Some("2025-01-01T00:00:00Z".to_string()),
            channel: Some("card".to_string()),
            currency: Some("NGN".to_string()),
            fees_naira: Some(75.0),
            via_webhook,
        }
    }

    #[test]
    fn test_both_paths_write_identical_final_fields() {
        let from_verify = payment_record_update(&confirmation(false));
        let from_webhook = payment_record_update(&confirmation(true));

        for key in ["status", "amount", "paid_at", "channel", "currency", "fees"] {
            assert_eq!(
                from_verify.get(key),
                from_webhook.get(key),
                "field {} must converge regardless of arrival path",
                key
            );
        }
    }

    #[test]
    fn test_only_webhook_path_sets_webhook_received() {
        let from_webhook = payment_record_update(&confirmation(true));
        assert!(from_webhook.get_bool("webhook_received").unwrap());

        let from_verify = payment_record_update(&confirmation(false));
        assert!(from_verify.get("webhook_received").is_none());
    }

    #[test]
    fn test_record_update_overwrites_success_fields() {
        let update = payment_record_update(&confirmation(false));
        assert_eq!(update.get_str("status").unwrap(), "success");
        assert_eq!(update.get_f64("amount").unwrap(), 5000.0);
        assert_eq!(update.get_str("paid_at").unwrap(), "2025-01-01T00:00:00Z");
        assert_eq!(update.get_f64("fees").unwrap(), 75.0);
    }

    #[test]
    fn test_application_update_mirrors_payment_fields() {
        let update = application_update(&confirmation(true));
        assert_eq!(update.get_str("payment_status").unwrap(), "paid");
        assert_eq!(update.get_f64("amount_paid").unwrap(), 5000.0);
        assert_eq!(update.get_str("paystack_reference").unwrap(), "T123");

        let nested = update.get_document("payment").unwrap();
        assert_eq!(nested.get_str("status").unwrap(), "success");
        assert_eq!(nested.get_f64("amount").unwrap(), 5000.0);
        assert_eq!(nested.get_str("reference").unwrap(), "T123");
    }

    #[test]
    fn test_updates_contain_no_accumulating_operators() {
        // The reconciliation write must stay an idempotent overwrite
        let record = payment_record_update(&confirmation(true));
        let application = application_update(&confirmation(true));
        for update in [record, application] {
            for key in update.keys() {
                assert!(!key.starts_with('$'), "unexpected operator {}", key);
            }
        }
    }
}
