use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod database;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use config::AppConfig;
use database::connection::get_db_client;
use services::cloudinary::CloudinaryService;
use services::email_service::EmailService;
use services::paystack_service::PaystackService;
use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Config loaded: {}", config.get_config_info());

    let db = get_db_client(&config).await;
    let app_state = initialize_app_state(db, &config).await;

    let app = build_router(app_state).await;
    start_server(app, &config).await;
}

async fn initialize_app_state(db: mongodb::Database, config: &AppConfig) -> AppState {
    let mut app_state = AppState::new(db, config.jwt_secret.clone());

    tracing::info!("🔧 Initializing Paystack service...");
    match PaystackService::from_env() {
        Ok(service) => {
            tracing::info!("✅ Paystack service initialized");
            app_state = app_state.with_paystack(Arc::new(service));
        }
        Err(e) => {
            tracing::error!("❌ Failed to initialize Paystack service: {}", e);
            tracing::warn!("Payment collection will be disabled");
        }
    }

    tracing::info!("🔧 Initializing email service...");
    match EmailService::from_env() {
        Ok(service) => {
            tracing::info!("✅ Email service initialized");
            app_state = app_state.with_email(Arc::new(service));
        }
        Err(e) => {
            tracing::error!("❌ Failed to initialize email service: {}", e);
            tracing::warn!("Transactional emails will be disabled");
        }
    }

    tracing::info!("🔧 Initializing Cloudinary service...");
    match CloudinaryService::from_env() {
        Ok(service) => {
            tracing::info!("✅ Cloudinary service initialized");
            app_state = app_state.with_cloudinary(Arc::new(service));
        }
        Err(e) => {
            tracing::error!("❌ Failed to initialize Cloudinary service: {}", e);
            tracing::warn!("Document uploads will be disabled");
        }
    }

    app_state
}

async fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/applications", routes::applications::routes())
        .nest("/api/payments", routes::payments::routes())
        .nest("/api/admin", routes::admin::routes(app_state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig) {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    tracing::info!("🚀 Server starting on {}", addr);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            axum::serve(listener, app).await.unwrap();
        }
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}

async fn root_handler() -> &'static str {
    "🎓 Sau University Admissions API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    use mongodb::bson::doc;

    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "paystack": state.paystack_service.is_some(),
        "email": state.email_service.is_some(),
        "cloudinary": state.cloudinary_service.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
