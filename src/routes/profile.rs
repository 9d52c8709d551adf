use actix_web::{web, HttpResponse};

use super::{ApiError, AppState, AuthenticatedUser};
use crate::models::{ProfileFields, ProfileUpdate};

/// Configure profile routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/profile")
            .route(web::get().to(get_profile))
            .route(web::put().to(save_profile))
            .route(web::patch().to(update_profile))
            .route(web::delete().to(delete_profile)),
    );
}

/// GET /api/v1/profile
async fn get_profile(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    match state.tracker.load_profile(user.uid()).await? {
        Some(profile) => Ok(HttpResponse::Ok().json(profile)),
        None => Err(ApiError::not_found("Profile not found")),
    }
}

/// Replace the whole profile (onboarding)
///
/// PUT /api/v1/profile
async fn save_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ProfileFields>,
) -> Result<HttpResponse, ApiError> {
    state.tracker.save_profile(user.uid(), &req).await?;
    Ok(HttpResponse::Ok().json(req.into_inner()))
}

/// Change selected fields (account page)
///
/// PATCH /api/v1/profile
async fn update_profile(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, ApiError> {
    state.tracker.update_profile(user.uid(), &req).await?;

    let profile = state
        .tracker
        .load_profile(user.uid())
        .await?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;
    Ok(HttpResponse::Ok().json(profile))
}

/// DELETE /api/v1/profile
async fn delete_profile(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    state.tracker.delete_profile(user.uid()).await?;
    Ok(HttpResponse::NoContent().finish())
}
