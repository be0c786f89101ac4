use std::sync::Arc;
use mongodb::Database;

use crate::services::payhero_service::PayheroService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub payhero_service: Option<Arc<PayheroService>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState {
            db,
            payhero_service: None,
        }
    }

    pub fn with_payhero(mut self, payhero_service: Arc<PayheroService>) -> Self {
        self.payhero_service = Some(payhero_service);
        self
    }
}
