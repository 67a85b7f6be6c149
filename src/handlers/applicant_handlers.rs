// handlers/applicant_handlers.rs
use axum::{
    extract::{Json, Path, State},
};
use chrono::Utc;
use mongodb::bson::{self, doc, Document};
use mongodb::Collection;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::{AppError, Result};
use crate::models::applicant::{
    Application, ApplicationResponse, ApplicationUpdate, CreateApplication, StatusCheckRequest,
};
use crate::services::email_service::EmailService;
use crate::state::AppState;

pub async fn create_application(
    State(state): State<AppState>,
    Json(payload): Json<CreateApplication>,
) -> Result<Json<ApplicationResponse>> {
    let applications: Collection<Application> = state.db.collection("applications");

    // One application per applicant
    let existing = applications
        .find_one(doc! { "email": &payload.email })
        .await?;

    if existing.is_some() {
        return Err(AppError::invalid_data(
            "An application with this email already exists",
        ));
    }

    let prospective_id = generate_unique_prospective_id(&applications).await?;

    let mut application = Application {
        id: None,
        prospective_id: prospective_id.clone(),
        first_name: payload.first_name,
        surname: payload.surname,
        email: payload.email,
        phone: payload.phone,
        date_of_birth: None,
        gender: None,
        address: None,
        state_of_origin: None,
        nationality: None,
        programme: payload.programme,
        mode_of_entry: None,
        previous_schools: None,
        exam_results: None,
        passport_photo_url: None,
        documents: Vec::new(),
        application_status: "draft".to_string(),
        reviewed_by: None,
        reviewed_at: None,
        review_note: None,
        payment_status: "pending".to_string(),
        amount_paid: 0.0,
        paystack_reference: None,
        paid_at: None,
        payment: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let insert_result = applications.insert_one(&application).await?;
    application.id = insert_result.inserted_id.as_object_id();

    info!(
        "Application created: {} ({})",
        prospective_id, application.email
    );

    // Welcome email is best effort
    if let Some(email_service) = &state.email_service {
        let html =
            EmailService::application_received_html(&application.first_name, &prospective_id);
        if let Err(e) = email_service
            .send(&application.email, "Your Application Has Been Received", &html)
            .await
        {
            error!("Failed to send application email to {}: {}", application.email, e);
        }
    }

    Ok(Json(application.into()))
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(prospective_id): Path<String>,
) -> Result<Json<ApplicationResponse>> {
    let applications: Collection<Application> = state.db.collection("applications");

    let application = applications
        .find_one(doc! { "prospective_id": &prospective_id })
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    Ok(Json(application.into()))
}

// Multi-step form save: merge the submitted fields into the document,
// leaving everything else as it is.
pub async fn update_application(
    State(state): State<AppState>,
    Path(prospective_id): Path<String>,
    Json(payload): Json<ApplicationUpdate>,
) -> Result<Json<ApplicationResponse>> {
    let mut set = build_update_document(&payload);

    if set.is_empty() {
        return Err(AppError::invalid_data("No fields to update"));
    }

    set.insert("updated_at", bson::DateTime::now());

    let applications: Collection<Application> = state.db.collection("applications");

    let result = applications
        .update_one(doc! { "prospective_id": &prospective_id }, doc! { "$set": set })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::ApplicationNotFound);
    }

    let application = applications
        .find_one(doc! { "prospective_id": &prospective_id })
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    Ok(Json(application.into()))
}

pub async fn submit_application(
    State(state): State<AppState>,
    Path(prospective_id): Path<String>,
) -> Result<Json<Value>> {
    let applications: Collection<Application> = state.db.collection("applications");

    let result = applications
        .update_one(
            doc! { "prospective_id": &prospective_id, "application_status": "draft" },
            doc! { "$set": {
                "application_status": "submitted",
                "updated_at": bson::DateTime::now(),
            }},
        )
        .await?;

    if result.matched_count == 0 {
        let existing = applications
            .find_one(doc! { "prospective_id": &prospective_id })
            .await?;
        return match existing {
            Some(_) => Err(AppError::invalid_data("Application has already been submitted")),
            None => Err(AppError::ApplicationNotFound),
        };
    }

    info!("Application submitted: {}", prospective_id);

    Ok(Json(json!({
        "success": true,
        "message": "Application submitted successfully",
        "prospective_id": prospective_id,
    })))
}

// Status tracking for applicants; prospective id and email must match
// the same application.
pub async fn check_status(
    State(state): State<AppState>,
    Json(payload): Json<StatusCheckRequest>,
) -> Result<Json<Value>> {
    let prospective_id = payload
        .prospective_id
        .ok_or_else(|| AppError::invalid_data("prospective_id is required"))?;
    let email = payload
        .email
        .ok_or_else(|| AppError::invalid_data("email is required"))?;

    let applications: Collection<Application> = state.db.collection("applications");

    let application = applications
        .find_one(doc! { "prospective_id": &prospective_id, "email": &email })
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    Ok(Json(json!({
        "success": true,
        "prospective_id": application.prospective_id,
        "application_status": application.application_status,
        "payment_status": application.payment_status,
        "amount_paid": application.amount_paid,
        "programme": application.programme,
    })))
}

fn generate_prospective_id() -> String {
    let year = Utc::now().format("%y");
    let serial = rand::thread_rng().gen_range(1000..10_000);
    format!("SAUNI{}{}", year, serial)
}

async fn generate_unique_prospective_id(
    applications: &Collection<Application>,
) -> Result<String> {
    for _ in 0..5 {
        let candidate = generate_prospective_id();
        let taken = applications
            .find_one(doc! { "prospective_id": &candidate })
            .await?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
    }
    Err(AppError::service("Could not allocate a prospective id"))
}

fn build_update_document(update: &ApplicationUpdate) -> Document {
    let mut set = Document::new();

    if let Some(first_name) = &update.first_name {
        set.insert("first_name", first_name.clone());
    }
    if let Some(surname) = &update.surname {
        set.insert("surname", surname.clone());
    }
    if let Some(phone) = &update.phone {
        set.insert("phone", phone.clone());
    }
    if let Some(date_of_birth) = &update.date_of_birth {
        set.insert("date_of_birth", date_of_birth.clone());
    }
    if let Some(gender) = &update.gender {
        set.insert("gender", gender.clone());
    }
    if let Some(address) = &update.address {
        set.insert("address", address.clone());
    }
    if let Some(state_of_origin) = &update.state_of_origin {
        set.insert("state_of_origin", state_of_origin.clone());
    }
    if let Some(nationality) = &update.nationality {
        set.insert("nationality", nationality.clone());
    }
    if let Some(programme) = &update.programme {
        set.insert("programme", programme.clone());
    }
    if let Some(mode_of_entry) = &update.mode_of_entry {
        set.insert("mode_of_entry", mode_of_entry.clone());
    }
    if let Some(previous_schools) = &update.previous_schools {
        set.insert("previous_schools", previous_schools.clone());
    }
    if let Some(exam_results) = &update.exam_results {
        set.insert("exam_results", exam_results.clone());
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prospective_id_format() {
        let id = generate_prospective_id();
        assert!(id.starts_with("SAUNI"));
        assert_eq!(id.len(), 11);
        assert!(id[5..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_build_update_only_includes_present_fields() {
        let update = ApplicationUpdate {
            first_name: None,
            surname: None,
            phone: Some("+2348012345678".to_string()),
            date_of_birth: None,
            gender: None,
            address: None,
            state_of_origin: None,
            nationality: None,
            programme: Some("Computer Science".to_string()),
            mode_of_entry: None,
            previous_schools: None,
            exam_results: None,
        };

        let set = build_update_document(&update);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get_str("phone").unwrap(), "+2348012345678");
        assert_eq!(set.get_str("programme").unwrap(), "Computer Science");
        assert!(set.get("first_name").is_none());
    }

    #[test]
    fn test_build_update_empty_payload() {
        let update = ApplicationUpdate {
            first_name: None,
            surname: None,
            phone: None,
            date_of_birth: None,
            gender: None,
            address: None,
            state_of_origin: None,
            nationality: None,
            programme: None,
            mode_of_entry: None,
            previous_schools: None,
            exam_results: None,
        };

        assert!(build_update_document(&update).is_empty());
    }
}
