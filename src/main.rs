use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sunrise::config::{BackendKind, LoggingSettings, Settings};
use sunrise::core::CollegeCatalog;
use sunrise::routes::{self, handle_json_payload_error, handle_path_error, handle_query_payload_error, AppState};
use sunrise::services::{AppwriteDocumentStore, DocumentBackend, MemoryDocumentStore};

fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match settings.format.as_str() {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.json().init(),
    }
}

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let mut settings = Settings::load().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(&settings.logging);
    info!("Starting Sunrise college tracker service...");

    if settings.auth.ensure_jwt_secret() {
        warn!("JWT_SECRET is not set; using a random signing key, sessions end on restart");
    }

    let catalog = match &settings.catalog.path {
        Some(path) => CollegeCatalog::from_path(path),
        None => CollegeCatalog::embedded(),
    }
    .map_err(|e| io_error("Failed to load college catalog", e))?;

    info!("College catalog loaded ({} colleges)", catalog.len());

    let backend = match settings.backend.kind {
        BackendKind::Memory => {
            info!("Using in-memory document store");
            DocumentBackend::Memory(MemoryDocumentStore::new())
        }
        BackendKind::Appwrite => {
            let store = AppwriteDocumentStore::from_settings(&settings.backend)
                .map_err(|e| io_error("Failed to initialize Appwrite client", e))?;
            info!("Appwrite document store initialized ({})", settings.backend.endpoint);
            DocumentBackend::Appwrite(store)
        }
    };

    let app_state = AppState::new(&settings, Arc::new(catalog), backend);

    let accounts = app_state
        .identity
        .load()
        .await
        .map_err(|e| io_error("Failed to load accounts", e))?;
    info!("Loaded {} accounts", accounts);

    info!(
        "Matcher initialized (max {} results, thresholds: {:?})",
        app_state.matcher.max_results(),
        settings.scoring
    );

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
