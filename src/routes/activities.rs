use actix_web::{web, HttpResponse, Responder};

use super::{ApiError, AppState, AuthenticatedUser};
use crate::core::templates::{
    categories_for_section, fields_for_section, initialize_state, max_items_for_section, resolve_template,
};
use crate::models::{ActivityRequest, AppPlatform, SectionQuery, TemplateResponse};

/// Configure template, activity and dashboard routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/templates/{platform}", web::get().to(get_template))
        .service(
            web::resource("/activities/{platform}")
                .route(web::get().to(list_activities))
                .route(web::post().to(create_activity)),
        )
        .service(
            web::resource("/activities/{platform}/{activity_id}")
                .route(web::put().to(update_activity))
                .route(web::delete().to(delete_activity)),
        )
        .route("/stats", web::get().to(dashboard_stats));
}

/// Form shape for a platform, optionally narrowed to one section
///
/// GET /api/v1/templates/{platform}?section={section}
async fn get_template(path: web::Path<String>, query: web::Query<SectionQuery>) -> impl Responder {
    let template = resolve_template(&path);
    let section = query.section.as_deref();

    let resolved_section = template.section(section).map(|s| s.key.clone());
    let section = resolved_section.as_deref();

    HttpResponse::Ok().json(TemplateResponse {
        template: template.clone(),
        section: resolved_section.clone(),
        fields: fields_for_section(template, section).to_vec(),
        categories: categories_for_section(template, section).to_vec(),
        max_items: max_items_for_section(template, section),
        initial_state: initialize_state(template, section),
    })
}

/// GET /api/v1/activities/{platform}?section={section}
async fn list_activities(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    query: web::Query<SectionQuery>,
) -> Result<HttpResponse, ApiError> {
    let platform = AppPlatform::from_id(&path);
    let entries = state
        .tracker
        .list_activities(user.uid(), platform, query.section.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Add an entry; rejected once the list is at its cap
///
/// POST /api/v1/activities/{platform}
///
/// Request body:
/// ```json
/// {
///   "section": "awards",
///   "fields": { "awardName": "National Merit Finalist", "...": "..." }
/// }
/// ```
async fn create_activity(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    req: web::Json<ActivityRequest>,
) -> Result<HttpResponse, ApiError> {
    let platform = AppPlatform::from_id(&path);
    let entry = state.tracker.save_activity(user.uid(), platform, None, &req).await?;

    tracing::info!("Created {} activity {} for {}", platform, entry.id, user.uid());
    Ok(HttpResponse::Created().json(entry))
}

/// PUT /api/v1/activities/{platform}/{activity_id}
async fn update_activity(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
    req: web::Json<ActivityRequest>,
) -> Result<HttpResponse, ApiError> {
    let (platform, activity_id) = path.into_inner();
    let entry = state
        .tracker
        .save_activity(user.uid(), AppPlatform::from_id(&platform), Some(&activity_id), &req)
        .await?;
    Ok(HttpResponse::Ok().json(entry))
}

/// DELETE /api/v1/activities/{platform}/{activity_id}
async fn delete_activity(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (platform, activity_id) = path.into_inner();
    state
        .tracker
        .delete_activity(user.uid(), AppPlatform::from_id(&platform), &activity_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/stats
async fn dashboard_stats(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    let stats = state.tracker.stats(user.uid()).await?;
    Ok(HttpResponse::Ok().json(stats))
}
