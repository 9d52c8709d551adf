use std::future::Future;
use std::pin::Pin;

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest, HttpResponse};
use validator::Validate;

use super::{ApiError, AppState};
use crate::models::{
    AuthResponse, ChangePasswordRequest, CredentialsRequest, DeleteAccountRequest, SessionStateResponse,
};
use crate::services::{IdentityProvider, IssuedSession, SessionUser};

/// Configure account routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/signup", web::post().to(sign_up))
        .route("/auth/signin", web::post().to(sign_in))
        .route("/auth/signout", web::post().to(sign_out))
        .route("/auth/session", web::get().to(session_state))
        .route("/auth/reauthenticate", web::post().to(reauthenticate))
        .route("/auth/password", web::post().to(change_password))
        .route("/auth/account", web::delete().to(delete_account));
}

/// Caller identified by a valid `Authorization: Bearer` token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub SessionUser);

impl AuthenticatedUser {
    pub fn uid(&self) -> &str {
        &self.0.uid
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token = bearer_token(req);
        let state = req.app_data::<web::Data<AppState>>().cloned();

        Box::pin(async move {
            let token = token.ok_or(ApiError::Unauthorized)?;
            let state = state.ok_or(ApiError::Unauthorized)?;
            let user = state.identity.verify_token(&token).await?;
            Ok(AuthenticatedUser(user))
        })
    }
}

fn auth_response(session: IssuedSession) -> AuthResponse {
    AuthResponse {
        uid: session.user.uid,
        email: session.user.email,
        token: session.token,
        expires_at: session.expires_at,
    }
}

fn validate<T: Validate>(req: &T) -> Result<(), ApiError> {
    req.validate().map_err(|errors| {
        tracing::info!("Validation failed: field_errors={:?}", errors);
        ApiError::bad_request("validation_failed", errors.to_string())
    })
}

/// Create an account
///
/// POST /api/v1/auth/signup
async fn sign_up(
    state: web::Data<AppState>,
    req: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    validate(&*req)?;
    let session = state.identity.create_account(&req.email, &req.password).await?;
    Ok(HttpResponse::Created().json(auth_response(session)))
}

/// POST /api/v1/auth/signin
async fn sign_in(
    state: web::Data<AppState>,
    req: web::Json<CredentialsRequest>,
) -> Result<HttpResponse, ApiError> {
    validate(&*req)?;
    let session = state.identity.sign_in(&req.email, &req.password).await?;
    Ok(HttpResponse::Ok().json(auth_response(session)))
}

/// POST /api/v1/auth/signout
async fn sign_out(state: web::Data<AppState>, user: AuthenticatedUser) -> Result<HttpResponse, ApiError> {
    state.identity.sign_out(user.uid()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/auth/session
async fn session_state(state: web::Data<AppState>, user: AuthenticatedUser) -> HttpResponse {
    let current = state.identity.session(user.uid()).current();
    HttpResponse::Ok().json(SessionStateResponse {
        signed_in: current.is_some(),
        uid: user.0.uid,
        email: user.0.email,
    })
}

/// POST /api/v1/auth/reauthenticate
async fn reauthenticate(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<DeleteAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    validate(&*req)?;
    state.identity.reauthenticate(user.uid(), &req.password).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Change password after confirming the current one
///
/// POST /api/v1/auth/password
///
/// Request body:
/// ```json
/// { "currentPassword": "string", "newPassword": "string" }
/// ```
///
/// Responds with a fresh session; earlier tokens stop working.
async fn change_password(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    validate(&*req)?;
    state.identity.reauthenticate(user.uid(), &req.current_password).await?;
    let session = state.identity.change_password(user.uid(), &req.new_password).await?;

    tracing::info!("Password changed for {}", user.uid());
    Ok(HttpResponse::Ok().json(auth_response(session)))
}

/// Delete the account and everything stored for it
///
/// DELETE /api/v1/auth/account
async fn delete_account(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<DeleteAccountRequest>,
) -> Result<HttpResponse, ApiError> {
    validate(&*req)?;
    state.identity.reauthenticate(user.uid(), &req.password).await?;
    state.tracker.delete_user_data(user.uid()).await?;
    state.identity.delete_account(user.uid()).await?;

    tracing::info!("Account {} deleted", user.uid());
    Ok(HttpResponse::NoContent().finish())
}
