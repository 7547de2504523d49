use std::sync::Arc;

use crate::geocoding::Geocoder;
use crate::poem_client::PoemGenerator;
use crate::session::SessionRegistry;
use crate::store::TableStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Remote table store. Created once at startup and shared by every session.
    pub store: Arc<dyn TableStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub poems: Arc<dyn PoemGenerator>,
    pub sessions: Arc<SessionRegistry>,
}
