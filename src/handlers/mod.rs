pub mod market_handlers;
pub mod payment_handlers;
pub mod profile_handlers;
