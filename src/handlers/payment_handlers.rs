// handlers/payment_handlers.rs
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
    Extension,
};
use chrono::{DateTime, Duration, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId},
    Collection,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::payment::{Payment, PaymentStatus, PaymentStatusQuery, PayheroCallback};
use crate::models::user::{Claims, User};
use crate::services::payhero_service::normalize_phone;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-payhero-signature";
pub const MARKET_ACCESS_HOURS: i64 = 24;

const UNLOCK_DESCRIPTION: &str = "Market Access Unlock";

#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    #[validate(custom(function = kenyan_phone))]
    pub phone: String,
}

fn kenyan_phone(phone: &str) -> std::result::Result<(), validator::ValidationError> {
    if normalize_phone(phone).is_some() {
        Ok(())
    } else {
        Err(validator::ValidationError::new("kenyan_phone"))
    }
}

/// Kick off the unlock payment. The amount is fixed server-side; a PENDING
/// payment keyed by the provider's checkout reference is recorded only after
/// the provider accepted the push. A rejected push records nothing.
pub async fn initiate_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<InitiatePaymentRequest>,
) -> Result<Json<Value>> {
    payload
        .validate()
        .map_err(|_| AppError::invalid_data("Enter a valid M-PESA number (07XX, 01XX or 2547XX)"))?;

    let payhero = state
        .payhero_service
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Payment service is not configured"))?;

    let user_id = ObjectId::parse_str(&claims.sub)?;

    let outcome = payhero.initiate_stk_push(&payload.phone, &claims.sub).await?;

    let now = Utc::now();
    let payment = Payment {
        id: None,
        user_id,
        amount: payhero.unlock_amount(),
        phone_number: outcome.phone_number.clone(),
        reference: outcome.reference.clone(),
        status: PaymentStatus::Pending,
        external_id: None,
        description: UNLOCK_DESCRIPTION.to_string(),
        created_at: now,
        updated_at: now,
    };

    let collection: Collection<Payment> = state.db.collection("payments");
    collection.insert_one(&payment, None).await?;

    info!(
        "Pending payment {} recorded for user {}",
        outcome.reference, claims.sub
    );

    Ok(Json(json!({
        "success": true,
        "data": outcome.provider_response,
    })))
}

/// Provider-facing webhook. The signature must check out before the body is
/// even parsed; after that the provider always gets `{"received": true}` so a
/// processing failure on our side does not turn into a retry storm.
pub async fn payhero_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let payhero = state
        .payhero_service
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Payment service is not configured"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::AuthError)?;

    if !payhero.verify_callback_signature(&body, signature) {
        warn!("Rejected callback with bad signature");
        return Err(AppError::AuthError);
    }

    let payload: PayheroCallback = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Unparseable callback payload: {}", e);
            return Ok(Json(json!({ "received": true })));
        }
    };

    if let Err(e) = process_callback(&state, payload).await {
        error!("Callback processing error: {}", e);
    }

    Ok(Json(json!({ "received": true })))
}

async fn process_callback(state: &AppState, payload: PayheroCallback) -> Result<()> {
    let payments: Collection<Payment> = state.db.collection("payments");
    let now = Utc::now();

    let Some(response) = payload.response else {
        warn!("Callback without response block (success={})", payload.success);
        return Ok(());
    };
    let reference = &response.checkout_request_id;

    if payload.success {
        let receipt = response.mpesa_receipt_number.unwrap_or_default();

        // Compare-and-set on PENDING: a re-delivered callback matches zero
        // documents here, so the access window below is extended at most once
        // per reference.
        let completed = payments
            .find_one_and_update(
                Payment::pending_by_reference(reference),
                Payment::complete_update(&receipt, now),
                None,
            )
            .await?;

        let Some(payment) = completed else {
            warn!(
                "Success callback for unknown or already-settled reference {}",
                reference
            );
            return Ok(());
        };

        info!("Payment {} completed, receipt {}", reference, receipt);

        let user_id = match payload.external_reference.as_deref() {
            Some(id) => ObjectId::parse_str(id)?,
            None => payment.user_id,
        };
        grant_market_access(state, user_id, now).await?;
    } else {
        let updated = payments
            .update_one(
                Payment::pending_by_reference(reference),
                Payment::fail_update(now),
                None,
            )
            .await?;

        if updated.matched_count == 0 {
            warn!(
                "Failure callback for unknown or already-settled reference {}",
                reference
            );
        } else {
            info!("Payment {} marked FAILED", reference);
        }
    }

    Ok(())
}

pub(crate) async fn grant_market_access(
    state: &AppState,
    user_id: ObjectId,
    now: DateTime<Utc>,
) -> Result<()> {
    let expiry = now + Duration::hours(MARKET_ACCESS_HOURS);

    let users: Collection<User> = state.db.collection("users");
    users
        .update_one(
            doc! { "_id": user_id },
            doc! { "$set": { "market_access_expiry": bson::DateTime::from_chrono(expiry) } },
            None,
        )
        .await?;

    info!("Granted market access to user {} until {}", user_id, expiry);
    Ok(())
}

/// Local unlock used in demos and development: grants the window immediately
/// and records a COMPLETED payment for history parity with real unlocks.
pub async fn simulate_unlock(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Value>> {
    let user_id = ObjectId::parse_str(&claims.sub)?;
    let now = Utc::now();

    grant_market_access(&state, user_id, now).await?;

    let amount = state
        .payhero_service
        .as_ref()
        .map(|p| p.unlock_amount())
        .unwrap_or(10.0);

    let payment = Payment {
        id: None,
        user_id,
        amount,
        phone_number: "SIMULATED".to_string(),
        reference: format!("SIM-{}", now.timestamp_millis()),
        status: PaymentStatus::Completed,
        external_id: Some("SIMULATED_RECEIPT".to_string()),
        description: "Local Simulation Unlock".to_string(),
        created_at: now,
        updated_at: now,
    };

    let collection: Collection<Payment> = state.db.collection("payments");
    collection.insert_one(&payment, None).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Market access granted via simulation",
    })))
}

// Polled by the paying client while it waits for the STK prompt to resolve.
pub async fn check_payment_status(
    State(state): State<AppState>,
    Json(query): Json<PaymentStatusQuery>,
) -> Result<Json<Value>> {
    let collection: Collection<Payment> = state.db.collection("payments");
    let payment = collection
        .find_one(doc! { "reference": &query.reference }, None)
        .await?
        .ok_or(AppError::DocumentNotFound)?;

    Ok(Json(json!({
        "reference": payment.reference,
        "status": payment.status.as_str(),
        "amount": payment.amount,
        "external_id": payment.external_id,
        "updated_at": payment.updated_at.to_rfc3339(),
    })))
}

pub async fn get_payment_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Payment>>> {
    let user_id = ObjectId::parse_str(&claims.sub)?;

    let collection: Collection<Payment> = state.db.collection("payments");
    let cursor = collection.find(doc! { "user_id": user_id }, None).await?;
    let mut payments: Vec<Payment> = cursor.try_collect().await?;

    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(payments))
}
