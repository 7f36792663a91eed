//! Local auth provider: Argon2id password hashes in the `accounts` table and
//! HS256 session tokens.

use std::sync::{Arc, RwLock};

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use adotely_types::api::{Claims, Session};
use adotely_types::{AuthCallback, AuthProvider, AuthState, StoreError, StoreResult, Subscription};

use crate::watch::WatchRegistry;
use crate::{Database, backend};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const MIN_PASSWORD_LEN: usize = 6;

/// Password reset tokens stay valid for one hour.
const RESET_TOKEN_TTL_MS: i64 = 60 * 60 * 1000;

/// Settings key holding the token of the signed-in session.
const SESSION_KEY: &str = "session";

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub session_days: i64,
}

impl AuthSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            session_days: 30,
        }
    }

    /// Read `ADOTELY_JWT_SECRET`, refusing an unset or placeholder value.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::checked(&std::env::var("ADOTELY_JWT_SECRET").unwrap_or_default())
    }

    pub fn checked(secret: &str) -> anyhow::Result<Self> {
        let secret = secret.trim();
        if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret) {
            anyhow::bail!("ADOTELY_JWT_SECRET is unset or still a placeholder");
        }
        Ok(Self::new(secret))
    }
}

pub struct LocalAuth {
    db: Arc<Database>,
    settings: AuthSettings,
    session: RwLock<Option<Session>>,
    watchers: Arc<WatchRegistry<AuthCallback>>,
}

impl LocalAuth {
    pub fn new(db: Arc<Database>, settings: AuthSettings) -> Self {
        Self {
            db,
            settings,
            session: RwLock::new(None),
            watchers: Arc::new(WatchRegistry::new()),
        }
    }

    /// Pick up the session persisted by an earlier run, if it is still valid.
    /// A stale token is discarded.
    pub fn resume(&self) -> StoreResult<Option<Session>> {
        let Some(token) = self.db.get_setting(SESSION_KEY).map_err(backend)? else {
            return Ok(None);
        };
        match self.restore(&token) {
            Ok(session) => {
                info!("Resumed session for {}", session.user_id);
                Ok(Some(session))
            }
            Err(StoreError::InvalidCredentials) => {
                warn!("Stored session is no longer valid, signing out");
                self.db.delete_setting(SESSION_KEY).map_err(backend)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Resume a session from its token.
    pub fn restore(&self, token: &str) -> StoreResult<Session> {
        let claims = self.verify_token(token)?;

        // The account may have been deleted since the token was issued.
        let account = self
            .db
            .get_account_by_id(&claims.sub)
            .map_err(backend)?
            .ok_or(StoreError::InvalidCredentials)?;

        let session = Session {
            user_id: account.id,
            email: account.email,
            token: token.to_string(),
        };
        self.start_session(session.clone());
        Ok(session)
    }

    pub fn verify_token(&self, token: &str) -> StoreResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| StoreError::InvalidCredentials)?;
        Ok(data.claims)
    }

    /// Complete a reset started by [`AuthProvider::send_password_reset`].
    pub fn reset_password(&self, token: &str, new_password: &str) -> StoreResult<()> {
        check_strength(new_password)?;

        let now = chrono::Utc::now().timestamp_millis();
        let account_id = self
            .db
            .take_password_reset(token, now)
            .map_err(backend)?
            .ok_or(StoreError::InvalidCredentials)?;

        let hash = hash_password(new_password)?;
        self.db.update_password(&account_id, &hash).map_err(backend)?;

        info!("Password reset completed for {}", account_id);
        Ok(())
    }

    fn create_token(&self, user_id: &str, email: &str) -> StoreResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::days(self.settings.session_days)).timestamp()
                as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.jwt_secret.as_bytes()),
        )
        .map_err(|e| StoreError::Unavailable(format!("token signing failed: {}", e)))
    }

    fn start_session(&self, session: Session) {
        let state = AuthState::SignedIn {
            user_id: session.user_id.clone(),
            email: session.email.clone(),
        };
        if let Err(e) = self.db.put_setting(SESSION_KEY, &session.token) {
            warn!("Could not persist session for {}: {}", session.user_id, e);
        }
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session);
        self.emit(state);
    }

    fn end_session(&self) {
        if let Err(e) = self.db.delete_setting(SESSION_KEY) {
            warn!("Could not clear persisted session: {}", e);
        }
        let previous = self.session.write().unwrap_or_else(|e| e.into_inner()).take();
        if previous.is_some() {
            self.emit(AuthState::SignedOut);
        }
    }

    fn emit(&self, state: AuthState) {
        for (_, callback) in self.watchers.matching(|_| true) {
            callback(state.clone());
        }
    }

    fn current_state(&self) -> AuthState {
        match self.session.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(s) => AuthState::SignedIn {
                user_id: s.user_id.clone(),
                email: s.email.clone(),
            },
            None => AuthState::SignedOut,
        }
    }
}

impl AuthProvider for LocalAuth {
    fn sign_in(&self, email: &str, password: &str) -> StoreResult<Session> {
        let email = normalize_email(email);
        let account = self
            .db
            .get_account_by_email(&email)
            .map_err(backend)?
            .ok_or(StoreError::InvalidCredentials)?;

        verify_password(&account.password, password)?;

        let token = self.create_token(&account.id, &account.email)?;
        let session = Session {
            user_id: account.id,
            email: account.email,
            token,
        };
        self.start_session(session.clone());

        debug!("Signed in {}", session.user_id);
        Ok(session)
    }

    fn sign_up(&self, email: &str, password: &str) -> StoreResult<String> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(StoreError::InvalidCredentials);
        }
        check_strength(password)?;

        if self.db.get_account_by_email(&email).map_err(backend)?.is_some() {
            return Err(StoreError::EmailTaken(email));
        }

        let user_id = Uuid::new_v4().to_string();
        let hash = hash_password(password)?;
        self.db.create_account(&user_id, &email, &hash).map_err(backend)?;

        let token = self.create_token(&user_id, &email)?;
        self.start_session(Session {
            user_id: user_id.clone(),
            email: email.clone(),
            token,
        });

        info!("Account created: {} ({})", user_id, email);
        Ok(user_id)
    }

    fn sign_out(&self) -> StoreResult<()> {
        self.end_session();
        Ok(())
    }

    fn send_password_reset(&self, email: &str) -> StoreResult<()> {
        let email = normalize_email(email);
        let account = self
            .db
            .get_account_by_email(&email)
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(email.clone()))?;

        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        let token = hex::encode(bytes);
        let expires_at = chrono::Utc::now().timestamp_millis() + RESET_TOKEN_TTL_MS;

        self.db
            .insert_password_reset(&token, &account.id, expires_at)
            .map_err(backend)?;

        // No mail transport locally. The token stays in `password_resets`
        // and is never logged.
        info!("Password reset requested for {}", email);
        debug!("Reset token issued for account {}", account.id);
        Ok(())
    }

    fn delete_current_user(&self) -> StoreResult<()> {
        let user_id = self.current_user_id().ok_or(StoreError::NotSignedIn)?;
        self.db.delete_account(&user_id).map_err(backend)?;
        self.end_session();

        warn!("Account deleted: {}", user_id);
        Ok(())
    }

    fn current_user_id(&self) -> Option<String> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|s| s.user_id.clone())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> StoreResult<Subscription> {
        let subscription = self.watchers.register("auth", callback.clone());
        callback(self.current_state());
        Ok(subscription)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_strength(password: &str) -> StoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(StoreError::WeakPassword(format!(
            "must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> StoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Unavailable(format!("password hashing failed: {}", e)))
}

fn verify_password(stored_hash: &str, password: &str) -> StoreResult<()> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| StoreError::Unavailable(format!("corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| StoreError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn auth() -> (Arc<Database>, LocalAuth) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let auth = LocalAuth::new(db.clone(), AuthSettings::new("test-secret"));
        (db, auth)
    }

    #[test]
    fn test_sign_up_signs_in() {
        let (_, auth) = auth();
        let id = auth.sign_up("Ana@Example.com ", "secret1").unwrap();
        assert_eq!(auth.current_user_id(), Some(id.clone()));

        auth.sign_out().unwrap();
        assert_eq!(auth.current_user_id(), None);

        let session = auth.sign_in("ana@example.com", "secret1").unwrap();
        assert_eq!(session.user_id, id);
        assert_eq!(auth.verify_token(&session.token).unwrap().sub, id);
    }

    #[test]
    fn test_rejects_bad_credentials_and_duplicates() {
        let (_, auth) = auth();
        auth.sign_up("ana@example.com", "secret1").unwrap();

        assert!(matches!(
            auth.sign_in("ana@example.com", "wrong!!"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_up("ana@example.com", "another1"),
            Err(StoreError::EmailTaken(_))
        ));
        assert!(matches!(
            auth.sign_up("bob@example.com", "12345"),
            Err(StoreError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_restore_session_from_token() {
        let (db, auth) = auth();
        auth.sign_up("ana@example.com", "secret1").unwrap();
        let token = auth.sign_in("ana@example.com", "secret1").unwrap().token;

        let other = LocalAuth::new(db, AuthSettings::new("test-secret"));
        let session = other.restore(&token).unwrap();
        assert_eq!(other.current_user_id(), Some(session.user_id));

        let wrong_key = LocalAuth::new(Arc::new(Database::open_in_memory().unwrap()), AuthSettings::new("other"));
        assert!(wrong_key.restore(&token).is_err());
    }

    #[test]
    fn test_auth_state_callbacks() {
        let (_, auth) = auth();
        let seen: Arc<Mutex<Vec<AuthState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = auth
            .on_auth_state_change(Arc::new(move |s| sink.lock().unwrap().push(s)))
            .unwrap();

        let id = auth.sign_up("ana@example.com", "secret1").unwrap();
        auth.delete_current_user().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], AuthState::SignedOut);
        assert!(matches!(&seen[1], AuthState::SignedIn { user_id, .. } if *user_id == id));
        assert_eq!(seen[2], AuthState::SignedOut);
    }

    #[test]
    fn test_password_reset_flow() {
        let (db, auth) = auth();
        let id = auth.sign_up("ana@example.com", "secret1").unwrap();
        assert!(matches!(
            auth.send_password_reset("nobody@example.com"),
            Err(StoreError::NotFound(_))
        ));
        auth.send_password_reset("ana@example.com").unwrap();

        let token: String = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT token FROM password_resets WHERE account_id = ?1",
                    [&id],
                    |r| r.get(0),
                )?)
            })
            .unwrap();

        auth.reset_password(&token, "brandnew").unwrap();
        assert!(auth.reset_password(&token, "again123").is_err());
        assert!(auth.sign_in("ana@example.com", "brandnew").is_ok());
    }

    #[test]
    fn test_session_survives_restart() {
        let (db, auth) = auth();
        let id = auth.sign_up("ana@example.com", "secret1").unwrap();

        let restarted = LocalAuth::new(db.clone(), AuthSettings::new("test-secret"));
        let session = restarted.resume().unwrap().unwrap();
        assert_eq!(session.user_id, id);
        assert_eq!(restarted.current_user_id(), Some(id));

        restarted.sign_out().unwrap();
        let again = LocalAuth::new(db, AuthSettings::new("test-secret"));
        assert!(again.resume().unwrap().is_none());
    }

    #[test]
    fn test_stale_session_is_discarded() {
        let (db, auth) = auth();
        auth.sign_up("ana@example.com", "secret1").unwrap();

        let rotated = LocalAuth::new(db.clone(), AuthSettings::new("rotated-secret"));
        assert!(rotated.resume().unwrap().is_none());
        assert_eq!(rotated.current_user_id(), None);
        assert_eq!(db.get_setting(SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_placeholder_secret_is_refused() {
        assert!(AuthSettings::checked("").is_err());
        assert!(AuthSettings::checked("change-me-to-a-random-string").is_err());
        assert_eq!(AuthSettings::checked(" s3cr3t ").unwrap().jwt_secret, "s3cr3t");
    }
}
