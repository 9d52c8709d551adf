use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use moka::sync::Cache;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::sync::{watch, RwLock};
use validator::ValidateEmail;

use super::documents::{paths, Document, DocumentStore};
use super::error::{AuthErrorCode, BackendError};
use crate::config::AuthSettings;

const MIN_PASSWORD_LEN: usize = 6;

/// Salt for the throwaway hash run when an email has no account
const UNKNOWN_ACCOUNT_SALT: [u8; 16] = [0; 16];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: String,
    pub email: String,
}

/// A signed-in user plus the bearer token that proves it
#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub user: SessionUser,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    /// Session generation; bumped on sign-out and password change
    pub gen: u64,
    pub iat: i64,
    pub exp: i64,
}

/// Observable signed-in state of one account.
///
/// Each account has its own watch channel; `None` means signed out.
#[derive(Debug, Clone)]
pub struct Session {
    rx: watch::Receiver<Option<SessionUser>>,
}

impl Session {
    pub fn current(&self) -> Option<SessionUser> {
        self.rx.borrow().clone()
    }

    /// Wait for the next sign-in or sign-out. `None` once the provider is gone.
    pub async fn changed(&mut self) -> Option<Option<SessionUser>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Account collaborator
pub trait IdentityProvider: Send + Sync + 'static {
    fn create_account(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<IssuedSession, BackendError>> + Send;

    /// Unknown emails and wrong passwords both fail with `auth/invalid-credential`
    fn sign_in(&self, email: &str, password: &str) -> impl Future<Output = Result<IssuedSession, BackendError>> + Send;

    /// Invalidate every token issued to the account so far
    fn sign_out(&self, uid: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Confirm the password again; unlocks sensitive operations for a short window
    fn reauthenticate(&self, uid: &str, password: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Requires a recent sign-in or reauthentication. Returns a fresh session
    /// since older tokens stop verifying.
    fn change_password(
        &self,
        uid: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<IssuedSession, BackendError>> + Send;

    /// Requires a recent sign-in or reauthentication
    fn delete_account(&self, uid: &str) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn verify_token(&self, token: &str) -> impl Future<Output = Result<SessionUser, BackendError>> + Send;

    /// Signed-in state of one account
    fn session(&self, uid: &str) -> Session;
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    salt: [u8; 16],
    hash: [u8; 32],
    generation: u64,
    last_auth: DateTime<Utc>,
}

/// Stored form of an account under `accounts/{uid}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    uid: String,
    email: String,
    salt: String,
    password_hash: String,
    generation: u64,
    last_auth: DateTime<Utc>,
}

impl Account {
    fn to_document(&self) -> Result<Document, BackendError> {
        let record = AccountRecord {
            uid: self.uid.clone(),
            email: self.email.clone(),
            salt: BASE64.encode(self.salt),
            password_hash: BASE64.encode(self.hash),
            generation: self.generation,
            last_auth: self.last_auth,
        };
        Ok(serde_json::from_value(serde_json::to_value(record)?)?)
    }

    fn from_document(data: Document) -> Result<Self, BackendError> {
        let record: AccountRecord = serde_json::from_value(Value::Object(data))?;
        Ok(Account {
            salt: decode_key_material(&record.salt)?,
            hash: decode_key_material(&record.password_hash)?,
            uid: record.uid,
            email: record.email,
            generation: record.generation,
            last_auth: record.last_auth,
        })
    }
}

fn decode_key_material<const N: usize>(encoded: &str) -> Result<[u8; N], BackendError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| BackendError::InvalidResponse(format!("Invalid account key material: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| BackendError::InvalidResponse("Account key material has the wrong length".into()))
}

#[derive(Default)]
struct Accounts {
    by_uid: HashMap<String, Account>,
    uid_by_email: HashMap<String, String>,
}

struct IdentityInner<S> {
    store: S,
    accounts: RwLock<Accounts>,
    sessions: Mutex<HashMap<String, watch::Sender<Option<SessionUser>>>>,
    failures: Cache<String, u32>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_ttl: chrono::Duration,
    recent_login: chrono::Duration,
    max_failed_attempts: u32,
    password_iterations: u32,
}

/// Accounts persisted through a [`DocumentStore`] with PBKDF2 password hashes
/// and HS256 session tokens.
///
/// Lookups are served from memory; every change is written through to the
/// store, and [`DocumentIdentityProvider::load`] restores accounts after a
/// restart.
pub struct DocumentIdentityProvider<S: DocumentStore> {
    inner: Arc<IdentityInner<S>>,
}

impl<S: DocumentStore> Clone for DocumentIdentityProvider<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DocumentStore> DocumentIdentityProvider<S> {
    pub fn new(settings: &AuthSettings, store: S) -> Self {
        let mut settings = settings.clone();
        if settings.ensure_jwt_secret() {
            tracing::warn!("No JWT secret configured; signing sessions with a random per-process key");
        }

        let failures = Cache::builder()
            .max_capacity(100_000)
            .time_to_live(Duration::from_secs(settings.lockout_secs))
            .build();

        Self {
            inner: Arc::new(IdentityInner {
                store,
                accounts: RwLock::new(Accounts::default()),
                sessions: Mutex::new(HashMap::new()),
                failures,
                encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
                decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
                token_ttl: chrono::Duration::seconds(settings.token_ttl_secs),
                recent_login: chrono::Duration::seconds(settings.recent_login_secs),
                max_failed_attempts: settings.max_failed_attempts,
                password_iterations: settings.password_iterations.max(1),
            }),
        }
    }

    /// Read persisted accounts into memory. Returns how many were loaded.
    pub async fn load(&self) -> Result<usize, BackendError> {
        let snapshot = self.inner.store.list(&paths::accounts()?).await?;

        let mut accounts = self.inner.accounts.write().await;
        let mut loaded = 0;
        for doc in snapshot {
            match Account::from_document(doc.data) {
                Ok(account) => {
                    accounts.uid_by_email.insert(account.email.clone(), account.uid.clone());
                    accounts.by_uid.insert(account.uid.clone(), account);
                    loaded += 1;
                }
                Err(e) => tracing::warn!("Skipping unreadable account {}: {}", doc.id, e),
            }
        }
        Ok(loaded)
    }

    async fn persist(&self, account: &Account) -> Result<(), BackendError> {
        self.inner
            .store
            .set(&paths::account(&account.uid)?, account.to_document()?)
            .await
    }

    /// PBKDF2 on the blocking pool; no account lock is held while it runs
    async fn hash_password(&self, password: &str, salt: [u8; 16]) -> Result<[u8; 32], BackendError> {
        let iterations = self.inner.password_iterations;
        let password = password.to_owned();

        let hash = tokio::task::spawn_blocking(move || {
            let mut hash = [0u8; 32];
            pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);
            hash
        })
        .await?;
        Ok(hash)
    }

    async fn password_matches(&self, password: &str, salt: [u8; 16], expected: &[u8; 32]) -> Result<bool, BackendError> {
        let computed = self.hash_password(password, salt).await?;
        Ok(bool::from(computed.as_slice().ct_eq(expected.as_slice())))
    }

    async fn new_credentials(&self, password: &str) -> Result<([u8; 16], [u8; 32]), BackendError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthErrorCode::WeakPassword.into());
        }
        let mut salt = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        Ok((salt, self.hash_password(password, salt).await?))
    }

    /// Salt and hash of an account, copied out so the lock is not held while hashing
    async fn credentials(&self, uid: &str) -> Option<([u8; 16], [u8; 32])> {
        let accounts = self.inner.accounts.read().await;
        accounts.by_uid.get(uid).map(|account| (account.salt, account.hash))
    }

    /// Stamp a successful password check. Fails with `rejected` if the
    /// account vanished or its password changed while hashing.
    async fn record_auth(&self, uid: &str, checked: &[u8; 32], rejected: AuthErrorCode) -> Result<Account, BackendError> {
        let mut accounts = self.inner.accounts.write().await;
        let account = accounts
            .by_uid
            .get_mut(uid)
            .filter(|account| account.hash == *checked)
            .ok_or(BackendError::Auth(rejected))?;
        account.last_auth = Utc::now();
        Ok(account.clone())
    }

    fn session_sender(&self, uid: &str) -> watch::Sender<Option<SessionUser>> {
        let mut sessions = self.inner.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(uid.to_string())
            .or_insert_with(|| watch::channel(None).0)
            .clone()
    }

    fn issue(&self, account: &Account) -> Result<IssuedSession, BackendError> {
        let now = Utc::now();
        let expires_at = now + self.inner.token_ttl;
        let claims = Claims {
            sub: account.uid.clone(),
            email: account.email.clone(),
            gen: account.generation,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.inner.encoding_key)?;

        let user = SessionUser {
            uid: account.uid.clone(),
            email: account.email.clone(),
        };
        self.session_sender(&account.uid).send_replace(Some(user.clone()));

        Ok(IssuedSession { user, token, expires_at })
    }

    fn end_session(&self, uid: &str, forget: bool) {
        let mut sessions = self.inner.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = sessions.get(uid) {
            tx.send_replace(None);
        }
        if forget {
            sessions.remove(uid);
        }
    }

    fn require_recent_login(&self, account: &Account) -> Result<(), BackendError> {
        if Utc::now() - account.last_auth > self.inner.recent_login {
            return Err(AuthErrorCode::RequiresRecentLogin.into());
        }
        Ok(())
    }

    fn record_failure(&self, email: &str) {
        let count = self.inner.failures.get(email).unwrap_or(0) + 1;
        self.inner.failures.insert(email.to_string(), count);
        tracing::warn!("Failed sign-in for {} ({} recent failures)", email, count);
    }
}

fn normalize_email(email: &str) -> Result<String, BackendError> {
    let email = email.trim().to_lowercase();
    if !email.validate_email() {
        return Err(AuthErrorCode::InvalidEmail.into());
    }
    Ok(email)
}

impl<S: DocumentStore> IdentityProvider for DocumentIdentityProvider<S> {
    async fn create_account(&self, email: &str, password: &str) -> Result<IssuedSession, BackendError> {
        let email = normalize_email(email)?;
        if self.inner.accounts.read().await.uid_by_email.contains_key(&email) {
            return Err(AuthErrorCode::EmailAlreadyInUse.into());
        }

        let (salt, hash) = self.new_credentials(password).await?;
        let account = Account {
            uid: uuid::Uuid::new_v4().simple().to_string(),
            email: email.clone(),
            salt,
            hash,
            generation: 0,
            last_auth: Utc::now(),
        };

        {
            let mut accounts = self.inner.accounts.write().await;
            if accounts.uid_by_email.contains_key(&email) {
                return Err(AuthErrorCode::EmailAlreadyInUse.into());
            }
            accounts.uid_by_email.insert(email.clone(), account.uid.clone());
            accounts.by_uid.insert(account.uid.clone(), account.clone());
        }

        if let Err(err) = self.persist(&account).await {
            let mut accounts = self.inner.accounts.write().await;
            accounts.by_uid.remove(&account.uid);
            accounts.uid_by_email.remove(&email);
            return Err(err);
        }

        tracing::info!("Created account {}", account.uid);
        self.issue(&account)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<IssuedSession, BackendError> {
        let email = normalize_email(email)?;

        if self.inner.failures.get(&email).unwrap_or(0) >= self.inner.max_failed_attempts {
            return Err(AuthErrorCode::TooManyRequests.into());
        }

        let found = {
            let accounts = self.inner.accounts.read().await;
            accounts
                .uid_by_email
                .get(&email)
                .and_then(|uid| accounts.by_uid.get(uid))
                .map(|account| (account.uid.clone(), account.salt, account.hash))
        };

        let Some((uid, salt, hash)) = found else {
            // Unknown emails cost the same hash as a wrong password
            self.hash_password(password, UNKNOWN_ACCOUNT_SALT).await?;
            self.record_failure(&email);
            return Err(AuthErrorCode::InvalidCredential.into());
        };

        if !self.password_matches(password, salt, &hash).await? {
            self.record_failure(&email);
            return Err(AuthErrorCode::InvalidCredential.into());
        }

        self.inner.failures.invalidate(&email);
        let account = self.record_auth(&uid, &hash, AuthErrorCode::InvalidCredential).await?;
        self.persist(&account).await?;

        tracing::info!("Signed in {}", account.uid);
        self.issue(&account)
    }

    async fn sign_out(&self, uid: &str) -> Result<(), BackendError> {
        let account = {
            let mut accounts = self.inner.accounts.write().await;
            accounts.by_uid.get_mut(uid).map(|account| {
                account.generation += 1;
                account.clone()
            })
        };
        if let Some(account) = account {
            self.persist(&account).await?;
        }

        self.end_session(uid, false);
        tracing::info!("Signed out {}", uid);
        Ok(())
    }

    async fn reauthenticate(&self, uid: &str, password: &str) -> Result<(), BackendError> {
        let (salt, hash) = self
            .credentials(uid)
            .await
            .ok_or(BackendError::Auth(AuthErrorCode::UserNotFound))?;

        if !self.password_matches(password, salt, &hash).await? {
            return Err(AuthErrorCode::WrongPassword.into());
        }

        let account = self.record_auth(uid, &hash, AuthErrorCode::WrongPassword).await?;
        self.persist(&account).await
    }

    async fn change_password(&self, uid: &str, new_password: &str) -> Result<IssuedSession, BackendError> {
        {
            let accounts = self.inner.accounts.read().await;
            let account = accounts
                .by_uid
                .get(uid)
                .ok_or(BackendError::Auth(AuthErrorCode::UserNotFound))?;
            self.require_recent_login(account)?;
        }

        let (salt, hash) = self.new_credentials(new_password).await?;

        let account = {
            let mut accounts = self.inner.accounts.write().await;
            let account = accounts
                .by_uid
                .get_mut(uid)
                .ok_or(BackendError::Auth(AuthErrorCode::UserNotFound))?;
            self.require_recent_login(account)?;
            account.salt = salt;
            account.hash = hash;
            account.generation += 1;
            account.clone()
        };
        self.persist(&account).await?;

        tracing::info!("Changed password for {}", uid);
        self.issue(&account)
    }

    async fn delete_account(&self, uid: &str) -> Result<(), BackendError> {
        {
            let accounts = self.inner.accounts.read().await;
            let account = accounts
                .by_uid
                .get(uid)
                .ok_or(BackendError::Auth(AuthErrorCode::UserNotFound))?;
            self.require_recent_login(account)?;
        }

        self.inner.store.delete(&paths::account(uid)?).await?;

        {
            let mut accounts = self.inner.accounts.write().await;
            if let Some(account) = accounts.by_uid.remove(uid) {
                accounts.uid_by_email.remove(&account.email);
            }
        }

        self.end_session(uid, true);
        tracing::info!("Deleted account {}", uid);
        Ok(())
    }

    async fn verify_token(&self, token: &str) -> Result<SessionUser, BackendError> {
        let data = decode::<Claims>(token, &self.inner.decoding_key, &Validation::new(Algorithm::HS256))
            .map_err(|_| BackendError::Auth(AuthErrorCode::InvalidToken))?;
        let claims = data.claims;

        let accounts = self.inner.accounts.read().await;
        match accounts.by_uid.get(&claims.sub) {
            Some(account) if account.generation == claims.gen => Ok(SessionUser {
                uid: account.uid.clone(),
                email: account.email.clone(),
            }),
            _ => Err(AuthErrorCode::InvalidToken.into()),
        }
    }

    fn session(&self, uid: &str) -> Session {
        Session {
            rx: self.session_sender(uid).subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::documents::MemoryDocumentStore;
    use std::time::Instant;

    fn settings() -> AuthSettings {
        AuthSettings {
            jwt_secret: "test-secret".into(),
            password_iterations: 1_000,
            max_failed_attempts: 3,
            ..Default::default()
        }
    }

    fn provider() -> DocumentIdentityProvider<MemoryDocumentStore> {
        DocumentIdentityProvider::new(&settings(), MemoryDocumentStore::new())
    }

    fn code(err: BackendError) -> &'static str {
        err.code()
    }

    #[tokio::test]
    async fn test_create_and_sign_in() {
        let identity = provider();
        let created = identity.create_account("Ada@Example.com", "hunter22").await.unwrap();
        assert_eq!(created.user.email, "ada@example.com");

        let session = identity.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(session.user.uid, created.user.uid);
        assert_eq!(identity.verify_token(&session.token).await.unwrap().uid, created.user.uid);
    }

    #[tokio::test]
    async fn test_account_errors() {
        let identity = provider();
        assert_eq!(code(identity.create_account("not-an-email", "hunter22").await.unwrap_err()), "auth/invalid-email");
        assert_eq!(code(identity.create_account("a@b.co", "12345").await.unwrap_err()), "auth/weak-password");

        identity.create_account("a@b.co", "123456").await.unwrap();
        assert_eq!(
            code(identity.create_account("a@b.co", "abcdef").await.unwrap_err()),
            "auth/email-already-in-use"
        );
    }

    #[tokio::test]
    async fn test_sign_in_does_not_reveal_which_emails_exist() {
        let identity = provider();
        identity.create_account("a@b.co", "123456").await.unwrap();

        let unknown = identity.sign_in("x@b.co", "123456").await.unwrap_err();
        let wrong = identity.sign_in("a@b.co", "wrong!").await.unwrap_err();
        assert_eq!(unknown.code(), "auth/invalid-credential");
        assert_eq!(wrong.code(), unknown.code());
        assert_eq!(wrong.user_message(), unknown.user_message());
    }

    #[tokio::test]
    async fn test_too_many_failures_locks_out() {
        let identity = provider();
        identity.create_account("a@b.co", "123456").await.unwrap();
        for _ in 0..3 {
            let _ = identity.sign_in("a@b.co", "nope-nope").await;
        }
        let err = identity.sign_in("a@b.co", "123456").await.unwrap_err();
        assert_eq!(err.code(), "auth/too-many-requests");
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_tokens_and_session() {
        let identity = provider();
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();
        let session = identity.session(&issued.user.uid);
        assert_eq!(session.current().map(|u| u.uid), Some(issued.user.uid.clone()));

        identity.sign_out(&issued.user.uid).await.unwrap();
        assert!(session.current().is_none());
        assert!(identity.verify_token(&issued.token).await.is_err());
    }

    #[tokio::test]
    async fn test_sessions_are_scoped_to_their_account() {
        let identity = provider();
        let ada = identity.create_account("ada@b.co", "123456").await.unwrap();
        let bob = identity.create_account("bob@b.co", "123456").await.unwrap();

        let ada_session = identity.session(&ada.user.uid);
        let bob_session = identity.session(&bob.user.uid);
        assert_eq!(ada_session.current().map(|u| u.email), Some("ada@b.co".to_string()));
        assert_eq!(bob_session.current().map(|u| u.email), Some("bob@b.co".to_string()));

        identity.sign_out(&bob.user.uid).await.unwrap();
        assert!(bob_session.current().is_none());
        assert_eq!(ada_session.current().map(|u| u.uid), Some(ada.user.uid));
    }

    #[tokio::test]
    async fn test_session_changes_are_observable() {
        let identity = provider();
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();
        let mut session = identity.session(&issued.user.uid);

        identity.sign_out(&issued.user.uid).await.unwrap();
        assert_eq!(session.changed().await, Some(None));

        identity.sign_in("a@b.co", "123456").await.unwrap();
        let change = session.changed().await.unwrap();
        assert_eq!(change.unwrap().uid, issued.user.uid);
    }

    #[tokio::test]
    async fn test_change_password_requires_recent_login() {
        let identity = DocumentIdentityProvider::new(
            &AuthSettings {
                password_iterations: 1_000,
                recent_login_secs: -1,
                ..Default::default()
            },
            MemoryDocumentStore::new(),
        );
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();
        let err = identity.change_password(&issued.user.uid, "654321").await.unwrap_err();
        assert_eq!(err.code(), "auth/requires-recent-login");
        let err = identity.delete_account(&issued.user.uid).await.unwrap_err();
        assert_eq!(err.code(), "auth/requires-recent-login");
    }

    #[tokio::test]
    async fn test_change_password_rotates_tokens() {
        let identity = provider();
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();
        identity.reauthenticate(&issued.user.uid, "123456").await.unwrap();
        assert_eq!(
            identity.reauthenticate(&issued.user.uid, "nope-nope").await.unwrap_err().code(),
            "auth/wrong-password"
        );

        let fresh = identity.change_password(&issued.user.uid, "654321").await.unwrap();
        assert!(identity.verify_token(&issued.token).await.is_err());
        assert!(identity.verify_token(&fresh.token).await.is_ok());
        assert!(identity.sign_in("a@b.co", "654321").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_account() {
        let store = MemoryDocumentStore::new();
        let identity = DocumentIdentityProvider::new(&settings(), store.clone());
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();
        identity.delete_account(&issued.user.uid).await.unwrap();

        assert!(identity.verify_token(&issued.token).await.is_err());
        assert_eq!(identity.sign_in("a@b.co", "123456").await.unwrap_err().code(), "auth/invalid-credential");
        assert!(store.get(&paths::account(&issued.user.uid).unwrap()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_accounts_survive_restart() {
        let store = MemoryDocumentStore::new();
        let first = DocumentIdentityProvider::new(&settings(), store.clone());
        let issued = first.create_account("a@b.co", "123456").await.unwrap();

        let restarted = DocumentIdentityProvider::new(&settings(), store.clone());
        assert_eq!(restarted.load().await.unwrap(), 1);
        assert_eq!(restarted.verify_token(&issued.token).await.unwrap().uid, issued.user.uid);
        assert_eq!(restarted.sign_in("a@b.co", "123456").await.unwrap().user.uid, issued.user.uid);

        restarted.sign_out(&issued.user.uid).await.unwrap();
        let again = DocumentIdentityProvider::new(&settings(), store);
        again.load().await.unwrap();
        assert!(again.verify_token(&issued.token).await.is_err());
        assert_eq!(
            again.create_account("a@b.co", "abcdef").await.unwrap_err().code(),
            "auth/email-already-in-use"
        );
    }

    #[tokio::test]
    async fn test_unreadable_account_documents_are_skipped() {
        let store = MemoryDocumentStore::new();
        let mut junk = Document::new();
        junk.insert("email".into(), Value::String("x@b.co".into()));
        store.set(&paths::account("broken").unwrap(), junk).await.unwrap();

        let identity = DocumentIdentityProvider::new(&settings(), store);
        assert_eq!(identity.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tokens_from_the_placeholder_secret_are_rejected() {
        let unset_secret = AuthSettings {
            password_iterations: 1_000,
            ..Default::default()
        };
        let identity = DocumentIdentityProvider::new(&unset_secret, MemoryDocumentStore::new());
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();

        let now = Utc::now().timestamp();
        let forged = Claims {
            sub: issued.user.uid.clone(),
            email: issued.user.email.clone(),
            gen: 0,
            iat: now,
            exp: now + 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &forged,
            &EncodingKey::from_secret(crate::config::PLACEHOLDER_JWT_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(identity.verify_token(&token).await.unwrap_err().code(), "auth/invalid-token");
        assert!(identity.verify_token(&issued.token).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_token_checks_do_not_wait_for_password_hashing() {
        let identity = DocumentIdentityProvider::new(
            &AuthSettings {
                jwt_secret: "test-secret".into(),
                password_iterations: 200_000,
                max_failed_attempts: 100,
                ..Default::default()
            },
            MemoryDocumentStore::new(),
        );
        let issued = identity.create_account("a@b.co", "123456").await.unwrap();

        let attempts: Vec<_> = (0..4)
            .map(|_| {
                let identity = identity.clone();
                tokio::spawn(async move { identity.sign_in("a@b.co", "wrong-password").await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let started = Instant::now();
        identity.verify_token(&issued.token).await.unwrap();
        let elapsed = started.elapsed();
        let sign_ins_pending = attempts.iter().any(|task| !task.is_finished());

        for task in attempts {
            assert_eq!(task.await.unwrap().unwrap_err().code(), "auth/invalid-credential");
        }
        assert!(sign_ins_pending);
        assert!(elapsed < Duration::from_millis(50), "verify_token took {:?}", elapsed);
    }
}
