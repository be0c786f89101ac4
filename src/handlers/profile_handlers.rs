// handlers/profile_handlers.rs
use axum::{extract::State, response::Json, Extension};
use chrono::Utc;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection,
};
use serde_json::{json, Value};

use crate::errors::{AppError, Result};
use crate::models::user::{Claims, ProfileResponse, UpdateProfileRequest, User};
use crate::state::AppState;

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>> {
    let user_id = ObjectId::parse_str(&claims.sub)?;

    let users: Collection<User> = state.db.collection("users");
    let user = users
        .find_one(doc! { "_id": user_id }, None)
        .await?
        .ok_or(AppError::DocumentNotFound)?;

    let is_premium = user.market_access_active(Utc::now());

    let role = if is_premium {
        "Premium Farmer".to_string()
    } else {
        user.role.clone().unwrap_or_else(|| "Farmer".to_string())
    };

    Ok(Json(ProfileResponse {
        name: user.name,
        email: user.email,
        role,
        location: user.location.unwrap_or_else(|| "Kenya".to_string()),
        is_premium,
        market_expiry: user.market_access_expiry.map(|d| d.to_chrono()),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Value>> {
    let user_id = ObjectId::parse_str(&claims.sub)?;

    let mut set = doc! {};
    if let Some(name) = &payload.name {
        set.insert("name", name);
    }
    if let Some(location) = &payload.location {
        set.insert("location", location);
    }

    if set.is_empty() {
        return Err(AppError::invalid_data("Nothing to update"));
    }

    let users: Collection<User> = state.db.collection("users");
    let result = users
        .update_one(doc! { "_id": user_id }, doc! { "$set": set }, None)
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::DocumentNotFound);
    }

    Ok(Json(json!({ "success": true })))
}
