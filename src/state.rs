use mongodb::Database;
use std::sync::Arc;

use crate::services::cloudinary::CloudinaryService;
use crate::services::email_service::EmailService;
use crate::services::paystack_service::PaystackService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt_secret: String,
    pub paystack_service: Option<Arc<PaystackService>>,
    pub email_service: Option<Arc<EmailService>>,
    pub cloudinary_service: Option<Arc<CloudinaryService>>,
}

impl AppState {
    pub fn new(db: Database, jwt_secret: String) -> Self {
        AppState {
            db,
            jwt_secret,
            paystack_service: None,
            email_service: None,
            cloudinary_service: None,
        }
    }

    pub fn with_paystack(mut self, paystack_service: Arc<PaystackService>) -> Self {
        self.paystack_service = Some(paystack_service);
        self
    }

    pub fn with_email(mut self, email_service: Arc<EmailService>) -> Self {
        self.email_service = Some(email_service);
        self
    }

    pub fn with_cloudinary(mut self, cloudinary_service: Arc<CloudinaryService>) -> Self {
        self.cloudinary_service = Some(cloudinary_service);
        self
    }
}
