// handlers/upload_handlers.rs
use axum::extract::{Json, Path, State};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use mongodb::bson::{self, doc};
use mongodb::Collection;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::applicant::{Application, ApplicationDocument};
use crate::state::AppState;

const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

pub async fn upload_document(
    State(state): State<AppState>,
    Path(prospective_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Value>> {
    let applications: Collection<Application> = state.db.collection("applications");

    applications
        .find_one(doc! { "prospective_id": &prospective_id })
        .await?
        .ok_or(AppError::ApplicationNotFound)?;

    let cloudinary = match &state.cloudinary_service {
        Some(service) => service.clone(),
        None => {
            return Err(AppError::ServiceUnavailable(
                "Document storage is not available".into(),
            ))
        }
    };

    let mut label = String::new();
    let mut file_name = String::new();
    let mut file_data: Option<Bytes> = None;

    // Process multipart form data
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.to_string()))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "label" => {
                label = field
                    .text()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;
            }
            "document" => {
                file_name = field.file_name().unwrap_or("document").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(e.to_string()))?;

                if data.len() > MAX_FILE_SIZE {
                    return Err(AppError::DocumentTooLarge);
                }

                file_data = Some(data);
            }
            _ => {}
        }
    }

    let data = file_data.ok_or_else(|| AppError::invalid_data("No document provided"))?;

    // Sniff the real content type, the client's file name is not trusted
    let mime = infer::get(&data)
        .map(|kind| kind.mime_type())
        .unwrap_or("");
    if !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(AppError::InvalidDocumentFormat);
    }

    let clean_name = sanitize_filename::sanitize(&file_name);
    let public_id = format!("{}_{}", prospective_id, Uuid::new_v4());

    let url = cloudinary
        .upload_document(&data, &clean_name, &public_id)
        .await?;

    if label == "passport_photo" {
        applications
            .update_one(
                doc! { "prospective_id": &prospective_id },
                doc! { "$set": {
                    "passport_photo_url": &url,
                    "updated_at": bson::DateTime::now(),
                }},
            )
            .await?;
    } else {
        let document = ApplicationDocument {
            name: if label.is_empty() {
                clean_name.clone()
            } else {
                label.clone()
            },
            url: url.clone(),
            uploaded_at: chrono::Utc::now().to_rfc3339(),
        };

        applications
            .update_one(
                doc! { "prospective_id": &prospective_id },
                doc! {
                    "$push": {
                        "documents": bson::to_bson(&document)
                            .map_err(|e| AppError::service(e.to_string()))?
                    },
                    "$set": { "updated_at": bson::DateTime::now() },
                },
            )
            .await?;
    }

    info!("Document uploaded for {}: {}", prospective_id, clean_name);

    Ok(Json(json!({
        "success": true,
        "url": url,
        "file_name": clean_name,
    })))
}
