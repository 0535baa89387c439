use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use coliving_match::config::{LoggingSettings, Settings};
use coliving_match::core::{
    CandidateFetcher, Clock, LifecycleManager, MatchGenerator, ProfileReader, Scorer, SystemClock,
};
use coliving_match::routes::{self, AppState};
use coliving_match::services::{
    CachedProfileStore, LogNotifier, Notifier, PostgresClient, ProfileStore, WebhookNotifier,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn init_tracing(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    init_tracing(&settings.logging);

    info!("Starting coliving match service...");

    // Initialize PostgreSQL client
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
            settings.database.acquire_timeout_secs,
            settings.database.idle_timeout_secs,
        )
        .await
        .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
    );

    info!("PostgreSQL client initialized");

    // Profile cache is optional
    let profiles: Arc<dyn ProfileStore> = if settings.cache.enabled {
        let ttl_secs = settings.cache.ttl_secs.unwrap_or(300);
        let max_entries = settings.cache.max_entries.unwrap_or(10_000);
        info!("Profile cache enabled ({} entries, TTL: {}s)", max_entries, ttl_secs);
        Arc::new(CachedProfileStore::new(postgres.clone(), max_entries, ttl_secs))
    } else {
        postgres.clone()
    };

    let notifier: Arc<dyn Notifier> = match &settings.notifier.webhook_url {
        Some(url) => {
            let timeout = Duration::from_secs(settings.notifier.timeout_secs.unwrap_or(5));
            let webhook = WebhookNotifier::new(url.clone(), timeout)
                .map_err(|e| startup_error("Failed to build notifier", e))?;
            info!("Webhook notifier initialized");
            Arc::new(webhook)
        }
        None => {
            info!("No webhook configured, notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let scorer = Scorer::new(settings.scoring_weights())
        .map_err(|e| startup_error("Invalid scoring weights", e))?;

    info!("Scorer initialized with weights: {:?}", scorer.weights());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let expiry = settings.expiry_policy();

    let generator = MatchGenerator::new(
        ProfileReader::new(profiles),
        CandidateFetcher::new(postgres.clone(), clock.clone(), settings.fetch_settings()),
        scorer,
        postgres.clone(),
        notifier.clone(),
        clock.clone(),
    )
    .with_settings(settings.generation_settings())
    .with_expiry(expiry);

    let lifecycle = LifecycleManager::new(postgres.clone(), postgres.clone(), notifier, clock, expiry);

    // Build application state
    let app_state = AppState {
        generator,
        lifecycle,
        postgres: Some(postgres),
        sweep_batch: settings.lifecycle.sweep_batch,
    };

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
