use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use super::{ApiError, AppState, AuthenticatedUser};
use crate::core::formatters::{app_type_short, format_app_type, format_deadline, format_deadline_type};
use crate::core::prompts::{platform_prompts, prompts_for_college};
use crate::models::{AppPlatform, CollegeEntry, EssayRequest, NewCollegeRequest};

/// Configure college list, essay and prompt routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/colleges")
            .route(web::get().to(list_colleges))
            .route(web::post().to(add_college)),
    )
    .service(
        web::resource("/colleges/{college_id}")
            .route(web::get().to(get_college))
            .route(web::delete().to(delete_college)),
    )
    .service(
        web::resource("/colleges/{college_id}/essays")
            .route(web::get().to(list_essays))
            .route(web::post().to(create_essay)),
    )
    .service(
        web::resource("/colleges/{college_id}/essays/{essay_id}")
            .route(web::put().to(update_essay))
            .route(web::delete().to(delete_essay)),
    )
    .route("/colleges/{college_id}/prompts", web::get().to(college_prompts))
    .route("/deadlines", web::get().to(deadline_calendar))
    .route("/prompts/{platform}", web::get().to(prompts_by_platform));
}

/// College entry with display labels for the dashboard
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollegeSummary {
    #[serde(flatten)]
    entry: CollegeEntry,
    app_type_label: String,
    app_type_short: String,
    deadline_label: String,
    deadline_type_label: String,
}

impl From<CollegeEntry> for CollegeSummary {
    fn from(entry: CollegeEntry) -> Self {
        let app_type = entry.app_type.as_str();
        Self {
            app_type_label: format_app_type(app_type),
            app_type_short: app_type_short(app_type),
            deadline_label: format_deadline(&entry.deadline),
            deadline_type_label: format_deadline_type(entry.deadline_type.as_deref().unwrap_or_default()),
            entry,
        }
    }
}

/// GET /api/v1/colleges
async fn list_colleges(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    let colleges: Vec<CollegeSummary> = state
        .tracker
        .list_colleges(user.uid())
        .await?
        .into_iter()
        .map(CollegeSummary::from)
        .collect();
    Ok(HttpResponse::Ok().json(colleges))
}

/// Deadlines by day plus the upcoming list, relative to today (UTC)
///
/// GET /api/v1/deadlines
async fn deadline_calendar(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    let today = Utc::now().date_naive();
    let calendar = state.tracker.deadlines(user.uid(), today).await?;
    Ok(HttpResponse::Ok().json(calendar))
}

/// Add a college from the catalog (`catalogId`) or by name
///
/// POST /api/v1/colleges
///
/// Request body:
/// ```json
/// {
///   "catalogId": "university-of-washington",
///   "name": "string",
///   "deadline": "2025-11-15",
///   "deadlineType": "regularDecision",
///   "appType": "commonApp"
/// }
/// ```
async fn add_college(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<NewCollegeRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Err(errors) = req.validate() {
        return Err(ApiError::bad_request("validation_failed", errors.to_string()));
    }

    let entry = state.tracker.add_college(user.uid(), &req).await?;
    Ok(HttpResponse::Created().json(CollegeSummary::from(entry)))
}

/// GET /api/v1/colleges/{college_id}
async fn get_college(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let college_id = path.into_inner();
    let entry = state
        .tracker
        .get_college(user.uid(), &college_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("College {} not found", college_id)))?;
    Ok(HttpResponse::Ok().json(CollegeSummary::from(entry)))
}

/// Remove a college and its essays
///
/// DELETE /api/v1/colleges/{college_id}
async fn delete_college(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    state.tracker.delete_college(user.uid(), &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/colleges/{college_id}/essays
async fn list_essays(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let essays = state.tracker.list_essays(user.uid(), &path).await?;
    Ok(HttpResponse::Ok().json(essays))
}

/// POST /api/v1/colleges/{college_id}/essays
async fn create_essay(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<EssayRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Err(errors) = req.validate() {
        return Err(ApiError::bad_request("validation_failed", errors.to_string()));
    }

    let essay = state.tracker.save_essay(user.uid(), &path, None, &req).await?;
    Ok(HttpResponse::Created().json(essay))
}

/// PUT /api/v1/colleges/{college_id}/essays/{essay_id}
async fn update_essay(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    req: web::Json<EssayRequest>,
) -> Result<HttpResponse, ApiError> {
    if let Err(errors) = req.validate() {
        return Err(ApiError::bad_request("validation_failed", errors.to_string()));
    }

    let (college_id, essay_id) = path.into_inner();
    let essay = state
        .tracker
        .save_essay(user.uid(), &college_id, Some(&essay_id), &req)
        .await?;
    Ok(HttpResponse::Ok().json(essay))
}

/// DELETE /api/v1/colleges/{college_id}/essays/{essay_id}
async fn delete_essay(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (college_id, essay_id) = path.into_inner();
    state.tracker.delete_essay(user.uid(), &college_id, &essay_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Prompts for a college on the caller's list
///
/// GET /api/v1/colleges/{college_id}/prompts
async fn college_prompts(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let college_id = path.into_inner();
    let entry = state
        .tracker
        .get_college(user.uid(), &college_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("College {} not found", college_id)))?;

    let lookup_id = entry.catalog_id.as_deref().unwrap_or(&entry.id);
    Ok(HttpResponse::Ok().json(prompts_for_college(lookup_id, entry.app_type.as_str())))
}

/// GET /api/v1/prompts/{platform}
async fn prompts_by_platform(path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(platform_prompts(AppPlatform::from_id(&path)))
}
