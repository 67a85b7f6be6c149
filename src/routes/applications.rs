use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{applicant_handlers, upload_handlers};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(applicant_handlers::create_application))
        .route("/status", post(applicant_handlers::check_status))
        .route(
            "/:prospective_id",
            get(applicant_handlers::get_application).put(applicant_handlers::update_application),
        )
        .route(
            "/:prospective_id/submit",
            post(applicant_handlers::submit_application),
        )
        .route(
            "/:prospective_id/documents",
            post(upload_handlers::upload_document),
        )
}
