// Route exports
pub mod activities;
pub mod auth;
pub mod catalog;
pub mod colleges;
pub mod error;
pub mod profile;

use actix_web::web;
use std::sync::Arc;

use crate::config::Settings;
use crate::core::{CollegeCatalog, FieldCipher, Matcher};
use crate::services::{DocumentBackend, DocumentIdentityProvider, Tracker};

pub use auth::AuthenticatedUser;
pub use error::{handle_json_payload_error, handle_path_error, handle_query_payload_error, ApiError};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Tracker<DocumentBackend>>,
    pub identity: Arc<DocumentIdentityProvider<DocumentBackend>>,
    pub matcher: Matcher,
}

impl AppState {
    /// Accounts and tracker data share one document store; call
    /// `identity.load()` before serving to restore existing accounts
    pub fn new(settings: &Settings, catalog: Arc<CollegeCatalog>, backend: DocumentBackend) -> Self {
        let identity = DocumentIdentityProvider::new(&settings.auth, backend.clone());
        let tracker = Tracker::new(backend, FieldCipher::from_settings(&settings.crypto), catalog);

        Self {
            tracker: Arc::new(tracker),
            identity: Arc::new(identity),
            matcher: Matcher::new((&settings.scoring).into(), settings.catalog.max_results),
        }
    }

    pub fn catalog(&self) -> &CollegeCatalog {
        self.tracker.catalog()
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(catalog::configure)
            .configure(auth::configure)
            .configure(profile::configure)
            .configure(colleges::configure)
            .configure(activities::configure),
    );
}
