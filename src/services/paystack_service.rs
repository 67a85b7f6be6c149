// services/paystack_service.rs
use hmac::{Hmac, Mac};
use reqwest::{header, Client};
use serde::Deserialize;
use sha2::Sha512;
use std::env;
use std::time::Duration;
use tracing::{error, info};

use crate::errors::{AppError, Result};

const DEFAULT_BASE_URL: &str = "https://api.paystack.co";

// Every Paystack endpoint wraps its payload in the same envelope
#[derive(Debug, Deserialize)]
struct PaystackResponse<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct InitializeData {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyData {
    pub status: String,
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
    #[serde(default)]
    pub gateway_response: Option<String>,
}

#[derive(Clone)]
pub struct PaystackService {
    secret_key: String,
    base_url: String,
    client: Client,
}

impl PaystackService {
    pub fn new(secret_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        PaystackService {
            secret_key,
            base_url,
            client,
        }
    }

    pub fn from_env() -> Result<Self> {
        let secret_key = env::var("PAYSTACK_SECRET_KEY")
            .map_err(|_| AppError::configuration("PAYSTACK_SECRET_KEY not set"))?;

        let base_url =
            env::var("PAYSTACK_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self::new(secret_key, base_url))
    }

    pub async fn initialize_transaction(
        &self,
        email: &str,
        amount_kobo: i64,
        metadata: serde_json::Value,
    ) -> Result<InitializeData> {
        info!("Initializing Paystack transaction for {} ({} kobo)", email, amount_kobo);

        let payload = serde_json::json!({
            "email": email,
            "amount": amount_kobo,
            "metadata": metadata,
        });

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::paystack(format!("initialize request failed: {}", e)))?;

        let data: InitializeData = Self::parse_response(response).await?;
        info!("Paystack transaction initialized: {}", data.reference);
        Ok(data)
    }

    pub async fn verify_transaction(&self, reference: &str) -> Result<VerifyData> {
        info!("Verifying Paystack transaction {}", reference);

        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await
            .map_err(|e| AppError::paystack(format!("verify request failed: {}", e)))?;

        let data: VerifyData = Self::parse_response(response).await?;
        info!("Paystack transaction {} status: {}", reference, data.status);
        Ok(data)
    }

    async fn parse_response<T>(response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            error!("Paystack API error: {} - {}", status, body);
            return Err(AppError::paystack(format!("HTTP {}: {}", status, body)));
        }

        let parsed: PaystackResponse<T> = serde_json::from_str(&body)
            .map_err(|e| AppError::paystack(format!("invalid response format: {}", e)))?;

        if !parsed.status {
            let message = parsed.message.unwrap_or_else(|| "unknown error".to_string());
            error!("Paystack rejected request: {}", message);
            return Err(AppError::paystack(message));
        }

        parsed
            .data
            .ok_or_else(|| AppError::paystack("response missing data"))
    }

    // Paystack signs the raw webhook body with HMAC-SHA512 keyed by the
    // account secret, hex encoded in the x-paystack-signature header.
    pub fn validate_webhook_signature(&self, payload: &[u8], signature: &str) -> bool {
        type HmacSha512 = Hmac<Sha512>;

        let mut mac = match HmacSha512::new_from_slice(self.secret_key.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload);
        let computed = hex::encode(mac.finalize().into_bytes());
        let provided = signature.trim();

        // Constant-time comparison
        if computed.len() != provided.len() {
            return false;
        }

        computed
            .as_bytes()
            .iter()
            .zip(provided.as_bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> PaystackService {
        PaystackService::new(
            "sk_test_test_key".to_string(),
            DEFAULT_BASE_URL.to_string(),
        )
    }

    fn sign(key: &str, payload: &[u8]) -> String {
        type HmacSha512 = Hmac<Sha512>;
        let mut mac = HmacSha512::new_from_slice(key.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let service = create_test_service();
        let payload = br#"{"event":"charge.success","data":{"reference":"r1","amount":500000}}"#;
        let signature = sign("sk_test_test_key", payload);
        assert!(service.validate_webhook_signature(payload, &signature));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let service = create_test_service();
        let payload = br#"{"event":"charge.success","data":{"reference":"r1","amount":500000}}"#;
        let signature = sign("sk_test_test_key", payload);
        let tampered = br#"{"event":"charge.success","data":{"reference":"r1","amount":900000}}"#;
        assert!(!service.validate_webhook_signature(tampered, &signature));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let service = create_test_service();
        let payload = b"test payload";
        let signature = sign("some_other_key", payload);
        assert!(!service.validate_webhook_signature(payload, &signature));
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let service = create_test_service();
        assert!(!service.validate_webhook_signature(b"test payload", "not-a-hex-signature"));
    }

    #[test]
    fn test_verify_data_parses_from_envelope() {
        let body = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "status": "success",
                "amount": 500000,
                "currency": "NGN",
                "channel": "card",
                "paid_at": "2025-01-01T00:00:00Z",
                "fees": 7500,
                "gateway_response": "Successful"
            }
        }"#;

        let parsed: PaystackResponse<VerifyData> = serde_json::from_str(body).unwrap();
        assert!(parsed.status);
        let data = parsed.data.unwrap();
        assert_eq!(data.status, "success");
        assert_eq!(data.amount, 500000);
        assert_eq!(data.channel.as_deref(), Some("card"));
    }

    #[test]
    fn test_failed_envelope_parses() {
        let body = r#"{"status": false, "message": "Invalid amount"}"#;
        let parsed: PaystackResponse<InitializeData> = serde_json::from_str(body).unwrap();
        assert!(!parsed.status);
        assert_eq!(parsed.message.as_deref(), Some("Invalid amount"));
        assert!(parsed.data.is_none());
    }
}
