use serde::{Deserialize, Serialize};
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};

/// Lifecycle of a mobile-money attempt. PENDING is the only non-terminal
/// state; the callback receiver moves a payment out of it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user_id: ObjectId,
    pub amount: f64,
    pub phone_number: String,

    /// Provider-assigned checkout id. Callbacks are matched on this.
    pub reference: String,
    pub status: PaymentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    pub description: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Matches a payment only while it is still PENDING. Both terminal
    /// transitions filter through this, so a re-delivered callback matches
    /// zero documents and cannot re-apply its effects.
    pub fn pending_by_reference(reference: &str) -> Document {
        doc! {
            "reference": reference,
            "status": PaymentStatus::Pending.as_str(),
        }
    }

    pub fn complete_update(receipt: &str, now: DateTime<Utc>) -> Document {
        doc! {
            "$set": {
                "status": PaymentStatus::Completed.as_str(),
                "external_id": receipt,
                "updated_at": bson::DateTime::from_chrono(now),
            }
        }
    }

    pub fn fail_update(now: DateTime<Utc>) -> Document {
        doc! {
            "$set": {
                "status": PaymentStatus::Failed.as_str(),
                "updated_at": bson::DateTime::from_chrono(now),
            }
        }
    }
}

// PayHero webhook payload. `response` and `external_reference` are absent on
// some failure deliveries.
#[derive(Debug, Deserialize)]
pub struct PayheroCallback {
    pub success: bool,

    #[serde(default)]
    pub response: Option<CallbackResponse>,

    #[serde(default)]
    pub external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackResponse {
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,

    #[serde(rename = "MpesaReceiptNumber", default)]
    pub mpesa_receipt_number: Option<String>,

    #[serde(rename = "Amount", default)]
    pub amount: Option<f64>,

    #[serde(rename = "PhoneNumber", default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusQuery {
    pub reference: String,
}
