use reqwest::{header, Client};
use serde_json::json;
use std::env;
use tracing::info;

use crate::errors::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Clone)]
pub struct EmailService {
    api_key: String,
    from: String,
    client: Client,
}

impl EmailService {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            api_key,
            from,
            client: Client::new(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("RESEND_API_KEY")
            .map_err(|_| AppError::configuration("RESEND_API_KEY not set"))?;

        let from = env::var("EMAIL_FROM")
            .unwrap_or_else(|_| "Admissions Office <admissions@sauni.edu.ng>".to_string());

        Ok(Self::new(api_key, from))
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let response = self
            .client
            .post(RESEND_API_URL)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| AppError::EmailError(format!("Email API error: {}", e)))?;

        if response.status().is_success() {
            info!("Email '{}' sent to {}", subject, to);
            Ok(())
        } else {
            Err(AppError::EmailError(format!(
                "Email sending failed with status: {}",
                response.status()
            )))
        }
    }

    pub fn application_received_html(first_name: &str, prospective_id: &str) -> String {
        format!(
            "<h2>Welcome to Sau University, {first_name}!</h2>\
             <p>Your application has been created successfully.</p>\
             <p>Your prospective student ID is <strong>{prospective_id}</strong>. \
             Keep it safe - you will need it to continue your application, pay the \
             application fee and track your admission status.</p>\
             <p>Admissions Office<br/>Sau University</p>"
        )
    }

    pub fn payment_receipt_html(
        first_name: &str,
        reference: &str,
        amount: f64,
        paid_at: Option<&str>,
    ) -> String {
        format!(
            "<h2>Payment Confirmed</h2>\
             <p>Dear {first_name},</p>\
             <p>We have received your payment of <strong>NGN {amount:.2}</strong>.</p>\
             <p>Transaction reference: <strong>{reference}</strong><br/>\
             Paid at: {}</p>\
             <p>You can now continue with the rest of your application.</p>\
             <p>Admissions Office<br/>Sau University</p>",
            paid_at.unwrap_or("-")
        )
    }

    pub fn status_update_html(first_name: &str, status: &str) -> String {
        format!(
            "<h2>Application Status Update</h2>\
             <p>Dear {first_name},</p>\
             <p>The status of your application has changed to \
             <strong>{status}</strong>.</p>\
             <p>Log in to the admissions portal to see the details.</p>\
             <p>Admissions Office<br/>Sau University</p>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_receipt_contains_transaction_details() {
        let html =
            EmailService::payment_receipt_html("Ada", "T12345", 5000.0, Some("2025-01-01T00:00:00Z"));
        assert!(html.contains("Ada"));
        assert!(html.contains("T12345"));
        assert!(html.contains("NGN 5000.00"));
        assert!(html.contains("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn test_payment_receipt_without_paid_at() {
        let html = EmailService::payment_receipt_html("Ada", "T12345", 5000.0, None);
        assert!(html.contains("Paid at: -"));
    }

    #[test]
    fn test_application_received_contains_prospective_id() {
        let html = EmailService::application_received_html("Chidi", "SAUNI259001");
        assert!(html.contains("Chidi"));
        assert!(html.contains("SAUNI259001"));
    }

    #[test]
    fn test_status_update_contains_status() {
        let html = EmailService::status_update_html("Ada", "admitted");
        assert!(html.contains("admitted"));
    }
}
