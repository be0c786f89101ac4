use serde::{Deserialize, Serialize};
use mongodb::bson::{self, oid::ObjectId};
use chrono::{DateTime, Utc};
use validator::Validate;

pub const LISTING_ACTIVE: &str = "ACTIVE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketListing {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,
    pub description: String,
    pub price: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,

    pub location: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    pub seller_id: ObjectId,
    pub status: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(range(min = 0.01, message = "price must be greater than 0"))]
    pub price: f64,

    #[serde(default)]
    pub quantity: Option<String>,

    #[validate(length(min = 1, message = "location is required"))]
    pub location: String,

    #[serde(default)]
    pub image_url: Option<String>,
}

/// Premium price-board row. Only readable while the buyer's access window is
/// open.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPrice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub commodity: String,
    pub market: String,
    pub unit: String,
    pub price: f64,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_requires_title_price_and_location() {
        let req = CreateListingRequest {
            title: "".to_string(),
            description: None,
            price: 0.0,
            quantity: None,
            location: "".to_string(),
            image_url: None,
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("price"));
        assert!(errors.field_errors().contains_key("location"));
    }

    #[test]
    fn listing_with_required_fields_passes() {
        let req = CreateListingRequest {
            title: "Grade 1 Maize".to_string(),
            description: Some("90kg bags".to_string()),
            price: 4200.0,
            quantity: Some("50 bags".to_string()),
            location: "Nakuru".to_string(),
            image_url: None,
        };
        assert!(req.validate().is_ok());
    }
}
