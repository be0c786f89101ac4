// config.rs
use std::env;

use crate::errors::{AppError, Result};

const DEFAULT_API_BASE: &str = "https://backend.payhero.co.ke/api/v2";

/// Everything the PayHero integration needs. Loaded once at startup; if any
/// required variable is missing the service runs with payments disabled.
#[derive(Debug, Clone)]
pub struct PayheroConfig {
    pub api_username: String,
    pub api_password: String,
    pub channel_id: i64,
    pub callback_url: String,
    pub webhook_secret: String,
    pub unlock_amount: f64,
    pub api_base: String,
}

impl PayheroConfig {
    pub fn from_env() -> Result<Self> {
        Ok(PayheroConfig {
            api_username: required("PAYHERO_API_USERNAME")?,
            api_password: required("PAYHERO_API_PASSWORD")?,
            channel_id: env::var("PAYHERO_CHANNEL_ID")
                .unwrap_or_else(|_| "4639".to_string())
                .parse()
                .map_err(|_| AppError::configuration("PAYHERO_CHANNEL_ID must be a number"))?,
            callback_url: required("PAYHERO_CALLBACK_URL")?,
            webhook_secret: required("PAYHERO_WEBHOOK_SECRET")?,
            unlock_amount: env::var("PAYHERO_UNLOCK_AMOUNT")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| AppError::configuration("PAYHERO_UNLOCK_AMOUNT must be a number"))?,
            api_base: env::var("PAYHERO_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
        })
    }

    pub fn payments_url(&self) -> String {
        format!("{}/payments", self.api_base)
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| AppError::configuration(format!("{} must be set", name)))
}
