use chrono::{DateTime, Utc};
use mongodb::bson;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    // Applicant-facing identifier, e.g. SAUNI259001
    pub prospective_id: String,

    // Personal details (step 1)
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_of_origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,

    // Programme choice (step 2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode_of_entry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_schools: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_results: Option<bson::Document>,

    // Uploaded documents (step 3)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_photo_url: Option<String>,
    #[serde(default)]
    pub documents: Vec<ApplicationDocument>,

    // Review
    pub application_status: String, // "draft", "submitted", "under_review", "admitted", "rejected"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_note: Option<String>,

    // Payment summary, written by the reconciliation path
    pub payment_status: String, // "pending", "paid"
    pub amount_paid: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paystack_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<NestedPayment>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

// Per-application copy of the payment record. Mirrors the top-level
// payments collection entry for the same reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedPayment {
    pub reference: String,
    pub amount: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDocument {
    pub name: String,
    pub url: String,
    pub uploaded_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateApplication {
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub programme: Option<String>,
}

// Multi-step form save: only the fields present in the payload are
// written, everything else on the document is left untouched.
#[derive(Debug, Deserialize)]
pub struct ApplicationUpdate {
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub state_of_origin: Option<String>,
    pub nationality: Option<String>,
    pub programme: Option<String>,
    pub mode_of_entry: Option<String>,
    pub previous_schools: Option<Vec<String>>,
    pub exam_results: Option<bson::Document>,
}

#[derive(Debug, Deserialize)]
pub struct StatusCheckRequest {
    pub prospective_id: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: String,
    pub prospective_id: String,
    pub first_name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub programme: Option<String>,
    pub application_status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub review_note: Option<String>,
    pub payment_status: String,
    pub amount_paid: f64,
    pub paystack_reference: Option<String>,
    pub paid_at: Option<String>,
    pub payment: Option<NestedPayment>,
    pub passport_photo_url: Option<String>,
    pub documents: Vec<ApplicationDocument>,
    pub created_at: String,
}

impl From<Application> for ApplicationResponse {
    fn from(app: Application) -> Self {
        ApplicationResponse {
            id: app.id.map(|id| id.to_hex()).unwrap_or_default(),
            prospective_id: app.prospective_id,
            first_name: app.first_name,
            surname: app.surname,
            email: app.email,
            phone: app.phone,
            programme: app.programme,
            application_status: app.application_status,
            reviewed_by: app.reviewed_by,
            reviewed_at: app.reviewed_at,
            review_note: app.review_note,
            payment_status: app.payment_status,
            amount_paid: app.amount_paid,
            paystack_reference: app.paystack_reference,
            paid_at: app.paid_at,
            payment: app.payment,
            passport_photo_url: app.passport_photo_url,
            documents: app.documents,
            created_at: app.created_at.to_rfc3339(),
        }
    }
}
