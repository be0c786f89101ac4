use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use mongodb::bson::{self, oid::ObjectId};

/// User documents are written by the external auth service; this model only
/// reads them and owns the single premium field, `market_access_expiry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_access_expiry: Option<bson::DateTime>,
}

impl User {
    pub fn market_access_active(&self, now: DateTime<Utc>) -> bool {
        market_access_active(self.market_access_expiry.map(|d| d.to_chrono()), now)
    }
}

/// The entitlement window check. Strictly greater-than: an expiry equal to
/// "now" is closed. Every gate in the API goes through this one function so
/// server responses and rendered state can never disagree.
pub fn market_access_active(expiry: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(expiry, Some(e) if e > now)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub name: Option<String>,
    pub email: String,
    pub role: String,
    pub location: String,
    pub is_premium: bool,
    pub market_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}
