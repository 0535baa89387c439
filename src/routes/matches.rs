use crate::core::{GenerateOptions, LifecycleManager, MatchError, MatchGenerator};
use crate::models::{
    ErrorResponse, GenerateMatchesRequest, GenerateMatchesResponse, HealthResponse,
    ListMatchesQuery, ListMatchesResponse, MatchResponse, RespondRequest, SweepRequest,
    SweepResponse,
};
use crate::services::PostgresClient;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub generator: MatchGenerator,
    pub lifecycle: LifecycleManager,
    /// Present when the stores are backed by PostgreSQL
    pub postgres: Option<Arc<PostgresClient>>,
    pub sweep_batch: usize,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/matches/generate", web::post().to(generate_matches))
        .route("/matches/expire", web::post().to(sweep_expired))
        .route("/matches", web::get().to(list_matches))
        .route("/matches/{id}", web::get().to(get_match))
        .route("/matches/{id}/contact", web::post().to(contact_match))
        .route("/matches/{id}/respond", web::post().to(respond_to_match))
        .route("/matches/{id}/expire", web::post().to(expire_match));
}

/// Map an engine error onto an HTTP response
fn error_response(err: &MatchError) -> HttpResponse {
    let (error, status_code) = match err {
        MatchError::ProfileNotFound(_) | MatchError::MatchNotFound(_) => ("not_found", 404),
        MatchError::AlreadyContacted { .. } | MatchError::InvalidTransition { .. } => {
            ("conflict", 409)
        }
        MatchError::InvalidPreferences { .. } => ("invalid_preferences", 422),
        MatchError::InvalidWeights(_) | MatchError::Store(_) | MatchError::TaskFailed(_) => {
            tracing::error!("Request failed: {}", err);
            ("internal_error", 500)
        }
    };

    let body = ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code,
    };

    match status_code {
        404 => HttpResponse::NotFound().json(body),
        409 => HttpResponse::Conflict().json(body),
        422 => HttpResponse::UnprocessableEntity().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: "Validation failed".to_string(),
        message: errors.to_string(),
        status_code: 400,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = match &state.postgres {
        Some(postgres) => postgres.health_check().await.unwrap_or(false),
        None => true,
    };

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Generate matches endpoint
///
/// POST /api/v1/matches/generate
///
/// Request body:
/// ```json
/// {
///   "searcherId": "string",
///   "minScoreThreshold": 40,
///   "candidateCap": 500
/// }
/// ```
async fn generate_matches(
    state: web::Data<AppState>,
    req: web::Json<GenerateMatchesRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for generate request: {:?}", errors);
        return validation_error(errors);
    }

    let options = GenerateOptions {
        min_score_threshold: req.min_score_threshold,
        candidate_cap: req.candidate_cap,
    };

    match state.generator.generate(&req.searcher_id, Some(options)).await {
        Ok(summary) => HttpResponse::Ok().json(GenerateMatchesResponse {
            searcher_id: req.searcher_id.clone(),
            summary,
        }),
        Err(e) => error_response(&e),
    }
}

/// List a searcher's matches, best first
///
/// GET /api/v1/matches?searcherId={searcherId}
async fn list_matches(
    state: web::Data<AppState>,
    query: web::Query<ListMatchesQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.lifecycle.matches_for_searcher(&query.searcher_id).await {
        Ok(matches) => {
            let matches: Vec<MatchResponse> = matches.into_iter().map(MatchResponse::from).collect();
            HttpResponse::Ok().json(ListMatchesResponse {
                total: matches.len(),
                matches,
            })
        }
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/matches/{id}
async fn get_match(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state.lifecycle.get(path.into_inner()).await {
        Ok(m) => HttpResponse::Ok().json(MatchResponse::from(m)),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/matches/{id}/contact
async fn contact_match(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state.lifecycle.contact(path.into_inner()).await {
        Ok(m) => HttpResponse::Ok().json(MatchResponse::from(m)),
        Err(e) => error_response(&e),
    }
}

/// Accept or decline a contacted match
///
/// POST /api/v1/matches/{id}/respond
///
/// Request body:
/// ```json
/// {
///   "decision": "accept|decline",
///   "by": "searcher|owner"
/// }
/// ```
async fn respond_to_match(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    req: web::Json<RespondRequest>,
) -> impl Responder {
    match state
        .lifecycle
        .respond(path.into_inner(), req.decision, req.by)
        .await
    {
        Ok(m) => HttpResponse::Ok().json(MatchResponse::from(m)),
        Err(e) => error_response(&e),
    }
}

/// POST /api/v1/matches/{id}/expire
async fn expire_match(state: web::Data<AppState>, path: web::Path<Uuid>) -> impl Responder {
    match state.lifecycle.expire_if_due(path.into_inner()).await {
        Ok(m) => HttpResponse::Ok().json(MatchResponse::from(m)),
        Err(e) => error_response(&e),
    }
}

/// Expire overdue open matches, for a periodic job
///
/// POST /api/v1/matches/expire
async fn sweep_expired(
    state: web::Data<AppState>,
    req: Option<web::Json<SweepRequest>>,
) -> impl Responder {
    let req = req.map(|r| r.into_inner()).unwrap_or_default();
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let batch = req.batch.unwrap_or(state.sweep_batch);

    match state.lifecycle.sweep_expired(batch).await {
        Ok(summary) => HttpResponse::Ok().json(SweepResponse::from(summary)),
        Err(e) => error_response(&e),
    }
}
