use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use super::{ApiError, AppState, AuthenticatedUser};
use crate::models::{
    AppPlatform, CatalogFilter, CollegeRecord, HealthResponse, RecommendRequest, RecommendResponse, SearchQuery,
};

/// Configure catalog and matching routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/catalog", web::get().to(list_catalog))
        .route("/catalog/filter", web::post().to(filter_catalog))
        .route("/catalog/{id}", web::get().to(get_college))
        .service(
            web::resource("/recommendations")
                .route(web::post().to(recommend))
                .route(web::get().to(recommend_for_user)),
        );
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let catalog_size = state.catalog().len();
    let status = if catalog_size > 0 { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_size,
        timestamp: chrono::Utc::now(),
    })
}

/// List or search the catalog
///
/// GET /api/v1/catalog?search={term}&appType={platform}
async fn list_catalog(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    let platform = query.app_type.as_deref().map(AppPlatform::from_id);

    let colleges: Vec<&CollegeRecord> = state
        .catalog()
        .search(query.search.as_deref().unwrap_or_default())
        .into_iter()
        .filter(|c| platform.map_or(true, |p| c.application.app_type == p))
        .collect();

    tracing::debug!("Catalog query {:?} matched {} colleges", query.search, colleges.len());
    HttpResponse::Ok().json(colleges)
}

/// Browse the catalog with hard filters
///
/// POST /api/v1/catalog/filter
///
/// Request body:
/// ```json
/// {
///   "region": "West",
///   "costType": "private",
///   "gpa": 3.8,
///   "sat": 1450,
///   "major": "Computer Science",
///   "prestigeLevel": 4
/// }
/// ```
async fn filter_catalog(state: web::Data<AppState>, req: web::Json<CatalogFilter>) -> impl Responder {
    HttpResponse::Ok().json(state.catalog().filter(&req))
}

/// GET /api/v1/catalog/{id}
async fn get_college(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    state
        .catalog()
        .get(&id)
        .map(|college| HttpResponse::Ok().json(college))
        .ok_or_else(|| ApiError::not_found(format!("College {} not found", id)))
}

/// Rank the catalog for a profile given in the request
///
/// POST /api/v1/recommendations
///
/// Request body:
/// ```json
/// {
///   "gpa": "3.85",
///   "testType": "SAT",
///   "satScore": 1450,
///   "region": "West",
///   "costPref": "No Preference",
///   "major": "Computer Science",
///   "majorPrestigeThreshold": 4,
///   "limit": 10
/// }
/// ```
async fn recommend(state: web::Data<AppState>, req: web::Json<RecommendRequest>) -> Result<HttpResponse, ApiError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for recommend request: field_errors={:?}", errors);
        return Err(ApiError::bad_request("validation_failed", errors.to_string()));
    }

    let limit = req
        .limit
        .map(usize::from)
        .unwrap_or_else(|| state.matcher.max_results());
    let result = state
        .matcher
        .recommend_with_limit(&req.profile, state.catalog().all(), limit);

    tracing::info!(
        "Returning {} recommendations (from {} colleges)",
        result.colleges.len(),
        result.total_candidates
    );

    Ok(HttpResponse::Ok().json(RecommendResponse {
        total_results: result.colleges.len(),
        total_candidates: result.total_candidates,
        colleges: result.colleges,
    }))
}

/// Rank the catalog for the caller's stored profile
///
/// GET /api/v1/recommendations
async fn recommend_for_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let result = state
        .tracker
        .recommend_for_user(user.uid(), &state.matcher, None)
        .await?;

    Ok(HttpResponse::Ok().json(RecommendResponse {
        total_results: result.colleges.len(),
        total_candidates: result.total_candidates,
        colleges: result.colleges,
    }))
}
