// handlers/market_handlers.rs
use axum::{extract::State, response::Json, Extension};
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection,
};
use tracing::info;
use validator::Validate;

use crate::errors::{AppError, Result};
use crate::models::market::{CreateListingRequest, MarketListing, MarketPrice, LISTING_ACTIVE};
use crate::models::user::{Claims, User};
use crate::state::AppState;

pub async fn get_listings(State(state): State<AppState>) -> Result<Json<Vec<MarketListing>>> {
    let collection: Collection<MarketListing> = state.db.collection("market_listings");

    let cursor = collection.find(doc! { "status": LISTING_ACTIVE }, None).await?;
    let mut listings: Vec<MarketListing> = cursor.try_collect().await?;

    listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(listings))
}

pub async fn create_listing(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateListingRequest>,
) -> Result<Json<MarketListing>> {
    payload
        .validate()
        .map_err(|e| AppError::invalid_data(format!("Invalid listing: {}", e)))?;

    let seller_id = ObjectId::parse_str(&claims.sub)?;
    let now = Utc::now();

    let listing = MarketListing {
        id: Some(ObjectId::new()),
        title: payload.title,
        description: payload.description.unwrap_or_default(),
        price: payload.price,
        quantity: payload.quantity,
        location: payload.location,
        image_url: payload.image_url,
        seller_id,
        status: LISTING_ACTIVE.to_string(),
        created_at: now,
        updated_at: now,
    };

    let collection: Collection<MarketListing> = state.db.collection("market_listings");
    collection.insert_one(&listing, None).await?;

    info!("Listing '{}' created by {}", listing.title, claims.sub);

    Ok(Json(listing))
}

/// Premium price board. The gate is the same strict expiry comparison the
/// profile reports, so a client that saw `is_premium: true` will not get a
/// 402 here (and vice versa).
pub async fn get_market_prices(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MarketPrice>>> {
    let user_id = ObjectId::parse_str(&claims.sub)?;

    let users: Collection<User> = state.db.collection("users");
    let user = users
        .find_one(doc! { "_id": user_id }, None)
        .await?
        .ok_or(AppError::DocumentNotFound)?;

    if !user.market_access_active(Utc::now()) {
        return Err(AppError::AccessExpired);
    }

    let collection: Collection<MarketPrice> = state.db.collection("market_prices");
    let cursor = collection.find(doc! {}, None).await?;
    let mut prices: Vec<MarketPrice> = cursor.try_collect().await?;

    prices.sort_by(|a, b| a.commodity.cmp(&b.commodity));

    Ok(Json(prices))
}
