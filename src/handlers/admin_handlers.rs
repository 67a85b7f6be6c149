// handlers/admin_handlers.rs
use axum::{
    extract::{Json, Path, Query, State},
    Extension,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::Collection;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::errors::{AppError, Result};
use crate::models::applicant::{Application, ApplicationResponse};
use crate::models::staff::Claims;
use crate::services::email_service::EmailService;
use crate::state::AppState;

const REVIEW_STATUSES: [&str; 4] = ["submitted", "under_review", "admitted", "rejected"];

#[derive(Debug, Deserialize)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    pub programme: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub note: Option<String>,
}

pub async fn list_applications(
    State(state): State<AppState>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<Json<Value>> {
    let applications: Collection<Application> = state.db.collection("applications");

    let mut filter = Document::new();
    if let Some(status) = &query.status {
        filter.insert("application_status", status);
    }
    if let Some(programme) = &query.programme {
        filter.insert("programme", programme);
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let skip = (page - 1) * limit as u64;

    let total = applications.count_documents(filter.clone()).await?;

    let cursor = applications
        .find(filter)
        .sort(doc! { "created_at": -1 })
        .skip(skip)
        .limit(limit)
        .await?;

    let results: Vec<Application> = cursor.try_collect().await?;
    let responses: Vec<ApplicationResponse> = results.into_iter().map(Into::into).collect();

    Ok(Json(json!({
        "success": true,
        "applications": responses,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

pub async fn get_application_details(
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

pub async fn update_application_status(
    State(state): State<AppState>,
    Path(prospective_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Value>> {
    let status = payload
        .status
        .ok_or_else(|| AppError::invalid_data("status is required"))?;

    if !is_valid_review_status(&status) {
        return Err(AppError::invalid_data(format!("Invalid status: {}", status)));
    }

    let applications: Collection<Application> = state.db.collection("applications");

    let mut set = doc! {
        "application_status": &status,
        "reviewed_by": &claims.username,
        "reviewed_at": Utc::now().to_rfc3339(),
        "updated_at": bson::DateTime::now(),
    };
    if let Some(note) = &payload.note {
        set.insert("review_note", note);
    }

    let result = applications
        .update_one(doc! { "prospective_id": &prospective_id }, doc! { "$set": set })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::ApplicationNotFound);
    }

    info!(
        "Application {} moved to {} by {}",
        prospective_id, status, claims.username
    );

    // Status email is best effort
    if let Some(email_service) = &state.email_service {
        if let Ok(Some(application)) = applications
            .find_one(doc! { "prospective_id": &prospective_id })
            .await
        {
            let html = EmailService::status_update_html(&application.first_name, &status);
            if let Err(e) = email_service
                .send(&application.email, "Application Status Update", &html)
                .await
            {
                error!(
                    "Failed to send status email to {}: {}",
                    application.email, e
                );
            }
        }
    }

    Ok(Json(json!({
        "success": true,
        "prospective_id": prospective_id,
        "status": status,
    })))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Value>> {
    let applications: Collection<Application> = state.db.collection("applications");

    let total = applications.count_documents(doc! {}).await?;

    let mut by_status = serde_json::Map::new();
    for status in ["draft", "submitted", "under_review", "admitted", "rejected"] {
        let count = applications
            .count_documents(doc! { "application_status": status })
            .await?;
        by_status.insert(status.to_string(), json!(count));
    }

    let paid = applications
        .count_documents(doc! { "payment_status": "paid" })
        .await?;

    // Confirmed application-fee revenue
    let mut cursor = applications
        .aggregate(vec![
            doc! { "$match": { "payment_status": "paid" } },
            doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$amount_paid" } } },
        ])
        .await?;

    let revenue = match cursor.try_next().await? {
        Some(doc) => doc.get_f64("total").unwrap_or(0.0),
        None => 0.0,
    };

    Ok(Json(json!({
        "success": true,
        "total_applications": total,
        "by_status": by_status,
        "paid_applications": paid,
        "total_revenue": revenue,
    })))
}

fn is_valid_review_status(status: &str) -> bool {
    REVIEW_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_statuses_accepted() {
        for status in ["submitted", "under_review", "admitted", "rejected"] {
            assert!(is_valid_review_status(status), "{} should be valid", status);
        }
    }

    #[test]
    fn test_unknown_statuses_rejected() {
        assert!(!is_valid_review_status("draft")); // staff cannot move back to draft
        assert!(!is_valid_review_status("paid"));
        assert!(!is_valid_review_status(""));
        assert!(!is_valid_review_status("ADMITTED"));
    }
}
