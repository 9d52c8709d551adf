use thiserror::Error;

/// Identity failures, named by the codes clients already understand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorCode {
    InvalidEmail,
    /// Sign-in failure that does not say whether the email exists
    InvalidCredential,
    UserNotFound,
    WrongPassword,
    EmailAlreadyInUse,
    WeakPassword,
    TooManyRequests,
    RequiresRecentLogin,
    InvalidToken,
}

impl AuthErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthErrorCode::InvalidEmail => "auth/invalid-email",
            AuthErrorCode::InvalidCredential => "auth/invalid-credential",
            AuthErrorCode::UserNotFound => "auth/user-not-found",
            AuthErrorCode::WrongPassword => "auth/wrong-password",
            AuthErrorCode::EmailAlreadyInUse => "auth/email-already-in-use",
            AuthErrorCode::WeakPassword => "auth/weak-password",
            AuthErrorCode::TooManyRequests => "auth/too-many-requests",
            AuthErrorCode::RequiresRecentLogin => "auth/requires-recent-login",
            AuthErrorCode::InvalidToken => "auth/invalid-token",
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the document store and identity collaborators
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Auth(AuthErrorCode),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl BackendError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            BackendError::Auth(code) => code.as_str(),
            BackendError::NotFound(_) => "not-found",
            BackendError::InvalidPath(_) => "invalid-argument",
            BackendError::Request(_) => "unavailable",
            BackendError::Api { .. } => "internal",
            BackendError::InvalidResponse(_) => "internal",
            BackendError::Serialization(_) => "internal",
            BackendError::Token(_) => AuthErrorCode::InvalidToken.as_str(),
            BackendError::Task(_) => "internal",
        }
    }

    pub fn user_message(&self) -> &'static str {
        user_message(self.code())
    }
}

impl From<AuthErrorCode> for BackendError {
    fn from(code: AuthErrorCode) -> Self {
        BackendError::Auth(code)
    }
}

/// Message shown to end users for a backend error code
pub fn user_message(code: &str) -> &'static str {
    match code {
        "auth/invalid-email" => "Please enter a valid email address.",
        "auth/invalid-credential" | "auth/user-not-found" | "auth/wrong-password" => "Incorrect email or password.",
        "auth/email-already-in-use" => "This email is already in use.",
        "auth/weak-password" => "Password should be at least 6 characters.",
        "auth/too-many-requests" => "Too many login attempts. Try again later.",
        _ => "An error occurred. Please try again.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_table() {
        assert_eq!(user_message("auth/invalid-email"), "Please enter a valid email address.");
        assert_eq!(user_message("auth/user-not-found"), user_message("auth/wrong-password"));
        assert_eq!(user_message("auth/invalid-credential"), "Incorrect email or password.");
        assert_eq!(user_message("auth/weak-password"), "Password should be at least 6 characters.");
        assert_eq!(user_message("storage/quota"), "An error occurred. Please try again.");
    }

    #[test]
    fn test_codes() {
        let err = BackendError::from(AuthErrorCode::TooManyRequests);
        assert_eq!(err.code(), "auth/too-many-requests");
        assert_eq!(err.user_message(), "Too many login attempts. Try again later.");
        assert_eq!(BackendError::NotFound("users/u1".into()).code(), "not-found");
    }
}
