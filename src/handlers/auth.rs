use axum::{
    extract::{Json, State},
    Extension,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use mongodb::bson::doc;
use mongodb::Collection;
use serde_json::{json, Value};

use crate::errors::{AppError, Result};
use crate::models::staff::{AuthResponse, Claims, CreateStaff, LoginStaff, Staff, StaffResponse};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateStaff>,
) -> Result<Json<AuthResponse>> {
    let collection: Collection<Staff> = state.db.collection("staff");

    // Check if the account exists by username or email
    let filter = doc! {
        "$or": [
            { "username": &payload.username },
            { "email": &payload.email }
        ]
    };

    let existing = collection.find_one(filter).await?;

    if existing.is_some() {
        return Err(AppError::invalid_data("Staff account already exists"));
    }

    let password_hash =
        hash(&payload.password, DEFAULT_COST).map_err(|_| AppError::AuthError)?;

    let staff = Staff {
        id: None,
        username: payload.username.clone(),
        email: payload.email.clone(),
        password_hash,
        role: payload.role.unwrap_or_else(|| "reviewer".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let insert_result = collection.insert_one(&staff).await?;
    let inserted_id = insert_result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::service("Insert did not return an ObjectId"))?;

    let token = create_token(&staff, &inserted_id.to_hex(), &state.jwt_secret)?;

    Ok(Json(AuthResponse {
        user: StaffResponse {
            id: inserted_id.to_hex(),
            username: staff.username,
            email: staff.email,
            role: staff.role,
        },
        token,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginStaff>,
) -> Result<Json<AuthResponse>> {
    let collection: Collection<Staff> = state.db.collection("staff");

    let staff = collection
        .find_one(doc! { "username": &payload.username })
        .await?
        .ok_or(AppError::AuthError)?;

    let valid = verify(&payload.password, &staff.password_hash).map_err(|_| AppError::AuthError)?;

    if !valid {
        return Err(AppError::AuthError);
    }

    let id = staff.id.ok_or_else(|| AppError::service("Staff record missing id"))?;
    let token = create_token(&staff, &id.to_hex(), &state.jwt_secret)?;

    Ok(Json(AuthResponse {
        user: StaffResponse {
            id: id.to_hex(),
            username: staff.username,
            email: staff.email,
            role: staff.role,
        },
        token,
    }))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Result<Json<Value>> {
    Ok(Json(json!({
        "id": claims.sub,
        "username": claims.username,
        "role": claims.role,
    })))
}

fn create_token(staff: &Staff, id_hex: &str, jwt_secret: &str) -> Result<String> {
    let claims = Claims {
        sub: id_hex.to_string(),
        username: staff.username.clone(),
        role: staff.role.clone(),
        exp: (Utc::now().timestamp() + 86400) as usize, // 24 hours
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|_| AppError::AuthError)
}
