// models/payment.rs
use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    // Paystack-issued reference, immutable once created. This is the only
    // key correlating initialization, client verification and the webhook.
    pub reference: String,
    pub prospective_id: String,
    pub email: String,

    // Major units (naira)
    pub amount: f64,
    pub payment_type: String,

    // Status tracking
    pub status: String, // "initialized", "success"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,

    // true when the last successful write came from the webhook path
    #[serde(default)]
    pub webhook_received: bool,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

// The portal frontend sends camelCase field names
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentRequest {
    pub email: Option<String>,
    pub amount: Option<f64>,
    pub prospective_id: Option<String>,
    pub payment_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializePaymentResponse {
    pub success: bool,
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub reference: Option<String>,
    pub prospective_id: Option<String>,
    pub email: Option<String>,
    pub amount: Option<f64>,
}

// Paystack webhook envelope. Only charge.success is handled, so the data
// shape here covers charge events; other event types are acknowledged
// before this type is ever deserialized.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookChargeData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChargeData {
    pub reference: String,
    // Minor units (kobo)
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub paid_at: Option<String>,
    #[serde(default)]
    pub fees: Option<i64>,
}

// Paystack transacts in the smallest currency unit; the books are kept
// in naira.
pub fn kobo_to_naira(kobo: i64) -> f64 {
    kobo as f64 / 100.0
}

pub fn naira_to_kobo(naira: f64) -> i64 {
    (naira * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kobo_to_naira() {
        assert_eq!(kobo_to_naira(500000), 5000.0);
        assert_eq!(kobo_to_naira(150), 1.5);
        assert_eq!(kobo_to_naira(0), 0.0);
    }

    #[test]
    fn test_naira_to_kobo() {
        assert_eq!(naira_to_kobo(5000.0), 500000);
        assert_eq!(naira_to_kobo(1.5), 150);
        assert_eq!(naira_to_kobo(0.015), 2); // rounds, never truncates
    }

    #[test]
    fn test_conversion_round_trip() {
        assert_eq!(naira_to_kobo(kobo_to_naira(500000)), 500000);
    }

    #[test]
    fn test_webhook_charge_success_parses() {
        let payload = serde_json::json!({
            "event": "charge.success",
            "data": {
                "reference": "T685312322670591",
                "amount": 500000,
                "currency": "NGN",
                "channel": "card",
                "paid_at": "2025-01-01T00:00:00Z",
                "fees": 7500,
                "customer": { "email": "a@x.com" }
            }
        });

        let event: WebhookEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.event, "charge.success");
        assert_eq!(event.data.reference, "T685312322670591");
        assert_eq!(event.data.amount, 500000);
        assert_eq!(event.data.paid_at.as_deref(), Some("2025-01-01T00:00:00Z"));
        assert_eq!(event.data.fees, Some(7500));
    }

    #[test]
    fn test_webhook_minimal_charge_data_parses() {
        // Paystack does not guarantee every optional field on every event
        let payload = serde_json::json!({
            "event": "charge.success",
            "data": { "reference": "ref-1", "amount": 1000 }
        });

        let event: WebhookEvent = serde_json::from_value(payload).unwrap();
        assert!(event.data.currency.is_none());
        assert!(event.data.paid_at.is_none());
        assert_eq!(event.data.amount, 1000);
    }
}
