// services/payhero_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::{error, info};

use crate::config::PayheroConfig;
use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize)]
pub struct StkPushRequest {
    pub amount: f64,
    pub phone_number: String,
    pub channel_id: i64,
    pub provider: String,
    pub external_reference: String,
    pub callback_url: String,
}

/// Loose view over the provider's response; sandbox and production differ on
/// which reference field they populate.
#[derive(Debug, Deserialize)]
pub struct StkPushResponse {
    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub reference: Option<String>,

    #[serde(default, alias = "CheckoutRequestID")]
    pub checkout_request_id: Option<String>,
}

impl StkPushResponse {
    pub fn checkout_reference(&self) -> Option<&str> {
        self.checkout_request_id
            .as_deref()
            .or(self.reference.as_deref())
    }
}

#[derive(Debug)]
pub struct StkPushOutcome {
    pub reference: String,
    pub phone_number: String,
    pub provider_response: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct PayheroService {
    config: PayheroConfig,
    client: Client,
}

impl PayheroService {
    pub fn new(config: PayheroConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        PayheroService { config, client }
    }

    pub fn unlock_amount(&self) -> f64 {
        self.config.unlock_amount
    }

    fn basic_token(&self) -> String {
        base64.encode(format!(
            "{}:{}",
            self.config.api_username, self.config.api_password
        ))
    }

    /// Push a request-to-pay prompt to the given phone. The phone is
    /// validated and normalised first; nothing leaves the process for an
    /// invalid number.
    pub async fn initiate_stk_push(&self, phone: &str, user_id: &str) -> Result<StkPushOutcome> {
        let formatted_phone = normalize_phone(phone).ok_or_else(|| {
            AppError::invalid_data("Enter a valid M-PESA number (07XX, 01XX or 2547XX)")
        })?;

        info!(
            "STK push for {} - KSh {}",
            formatted_phone, self.config.unlock_amount
        );

        let stk_request = StkPushRequest {
            amount: self.config.unlock_amount,
            phone_number: formatted_phone.clone(),
            channel_id: self.config.channel_id,
            provider: "m-pesa".to_string(),
            external_reference: user_id.to_string(),
            callback_url: self.config.callback_url.clone(),
        };

        let response = self
            .client
            .post(self.config.payments_url())
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", self.basic_token()),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .json(&stk_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("STK push failed: {} - {}", status, body);
            return Err(AppError::payment(format!("STK push failed: {}", status)));
        }

        let provider_response: serde_json::Value = response.json().await?;
        let parsed: StkPushResponse = serde_json::from_value(provider_response.clone())?;
        let reference = parsed
            .checkout_reference()
            .ok_or_else(|| AppError::payment("Provider response missing checkout reference"))?
            .to_string();

        info!("STK push initiated: {} -> {}", formatted_phone, reference);

        Ok(StkPushOutcome {
            reference,
            phone_number: formatted_phone,
            provider_response,
        })
    }

    /// Callbacks carry a lowercase hex HMAC-SHA256 of the raw body in
    /// `x-payhero-signature`, keyed with the shared webhook secret. Payloads
    /// failing this check are never parsed.
    pub fn verify_callback_signature(&self, payload: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    }
}

/// Normalise a Kenyan mobile number to `254XXXXXXXXX`. Accepts the local
/// `07XX`/`01XX` forms, bare `7XX`/`1XX`, and the international form with or
/// without `+`. Anything else is rejected.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let phone = phone.trim();
    let phone = phone.strip_prefix('+').unwrap_or(phone);

    if phone.is_empty() || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let local = if let Some(rest) = phone.strip_prefix("254") {
        rest
    } else if let Some(rest) = phone.strip_prefix('0') {
        rest
    } else {
        phone
    };

    // Mobile subscriber ranges are 7XXXXXXXX and 1XXXXXXXX
    if local.len() == 9 && (local.starts_with('7') || local.starts_with('1')) {
        return Some(format!("254{}", local));
    }

    None
}
