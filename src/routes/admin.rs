use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::handlers::{admin_handlers, auth};
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(auth::me))
        .route("/applications", get(admin_handlers::list_applications))
        .route(
            "/applications/:prospective_id",
            get(admin_handlers::get_application_details),
        )
        .route(
            "/applications/:prospective_id/status",
            put(admin_handlers::update_application_status),
        )
        .route("/stats", get(admin_handlers::get_stats))
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected)
}
