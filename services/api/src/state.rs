//! Application state shared across handlers

use auth::JwtService;
use std::sync::Arc;

use crate::repositories::ReservationStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub jwt_service: JwtService,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>, jwt_service: JwtService) -> Self {
        Self { store, jwt_service }
    }
}
