use serde::{Deserialize, Serialize};
use validator::Validate;

use super::domain::UserProfile;
use super::template::EntryFields;

/// Sign-up / sign-in body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "current_password", rename = "currentPassword")]
    pub current_password: String,
    #[validate(length(min = 1))]
    #[serde(alias = "new_password", rename = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeleteAccountRequest {
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request to rank the catalog against a profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub profile: UserProfile,
    #[validate(range(min = 1, max = 100))]
    #[serde(default)]
    pub limit: Option<u16>,
}

/// Add a college to the user's list, either from the catalog or by hand
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCollegeRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(default)]
    pub name: Option<String>,
    #[serde(alias = "catalog_id", rename = "catalogId", default)]
    pub catalog_id: Option<String>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(alias = "deadline_type", rename = "deadlineType", default)]
    pub deadline_type: Option<String>,
    #[serde(alias = "app_type", rename = "appType", default)]
    pub app_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EssayRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub category: String,
    #[validate(range(min = 1, max = 5000))]
    #[serde(alias = "word_limit", rename = "wordLimit", default)]
    pub word_limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRequest {
    #[serde(default)]
    pub section: Option<String>,
    pub fields: EntryFields,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionQuery {
    #[serde(default)]
    pub section: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(alias = "app_type", rename = "appType", default)]
    pub app_type: Option<String>,
}
