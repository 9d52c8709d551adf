use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::ScoredCollege;
use super::template::{ApplicationTemplate, EntryFields, FieldDescriptor};

/// Response for the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub colleges: Vec<ScoredCollege>,
    pub total_results: usize,
    pub total_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub catalog_size: usize,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Issued session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub uid: String,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signed-in state of the caller's account in this process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateResponse {
    pub uid: String,
    pub email: String,
    pub signed_in: bool,
}

/// Template resolved for one platform/section, ready to drive a form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateResponse {
    pub template: ApplicationTemplate,
    pub section: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    pub categories: Vec<String>,
    pub max_items: usize,
    pub initial_state: EntryFields,
}
