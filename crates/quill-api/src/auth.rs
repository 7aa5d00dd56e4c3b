use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use quill_db::{Database, StoreError};
use quill_types::api::Claims;

pub const SESSION_COOKIE: &str = "quill_session";

/// Hash checked against when the email is unknown, so a miss costs the same
/// as a wrong password.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password("quill-dummy-password").unwrap_or_default());

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email already registered")]
    EmailTaken,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The signed-in user, as seen by handlers and actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated { user_id: Uuid },
    Unauthenticated,
}

/// An issued session. The token stays inside this module; callers only learn
/// whose session it is.
#[derive(Debug)]
pub struct Session {
    token: String,
    user_id: Uuid,
    ttl: chrono::Duration,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

/// Per-request slot an action writes its session into. The HTTP layer turns
/// it into a `Set-Cookie` header afterwards.
#[derive(Debug, Default)]
pub struct SessionJar {
    issued: Option<Session>,
}

impl SessionJar {
    pub fn store(&mut self, session: Session) -> AuthStatus {
        let status = AuthStatus::Authenticated {
            user_id: session.user_id,
        };
        self.issued = Some(session);
        status
    }

    pub fn status(&self) -> AuthStatus {
        match &self.issued {
            Some(session) => AuthStatus::Authenticated {
                user_id: session.user_id,
            },
            None => AuthStatus::Unauthenticated,
        }
    }

    /// Adds the session cookie to `cookies` if a session was issued.
    pub fn write(self, cookies: CookieJar) -> CookieJar {
        match self.issued {
            Some(session) => cookies.add(session_cookie(session.token, session.ttl)),
            None => cookies,
        }
    }
}

pub fn clear_session(cookies: CookieJar) -> CookieJar {
    cookies.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// The cookie expires together with the token it carries.
fn session_cookie(token: String, ttl: chrono::Duration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .max_age(cookie::time::Duration::seconds(ttl.num_seconds()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[derive(Clone)]
pub struct Authenticator {
    secret: String,
    ttl: chrono::Duration,
}

impl Authenticator {
    pub fn new(secret: impl Into<String>, ttl_hours: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: chrono::Duration::hours(ttl_hours),
        }
    }

    /// Exchanges an email/password pair for a session. Blocking: runs
    /// Argon2 and a store lookup.
    pub fn sign_in(&self, db: &Database, email: &str, password: &str) -> Result<Session, AuthError> {
        let Some(user) = db.get_user_by_email(email)? else {
            let _ = verify_password(&DUMMY_HASH, password);
            debug!("Sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(&user.password, password)?;
        self.issue(user.id, &user.email)
    }

    /// Creates the account and signs it in. Blocking.
    pub fn register(&self, db: &Database, email: &str, password: &str) -> Result<Session, AuthError> {
        let password_hash = hash_password(password)?;
        let user = db
            .create_user(Uuid::new_v4(), email, &password_hash)
            .map_err(|e| if e.is_conflict() { AuthError::EmailTaken } else { e.into() })?;

        self.issue(user.id, &user.email)
    }

    fn issue(&self, user_id: Uuid, email: &str) -> Result<Session, AuthError> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            exp: (chrono::Utc::now() + self.ttl).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(Session {
            token,
            user_id,
            ttl: self.ttl,
        })
    }

    /// Resolves a session token. Expired, forged or malformed tokens give `None`.
    pub fn verify(&self, token: &str) -> Option<AuthUser> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()?;

        Some(AuthUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }

    pub fn user_from_cookies(&self, cookies: &CookieJar) -> Option<AuthUser> {
        cookies
            .get(SESSION_COOKIE)
            .and_then(|cookie| self.verify(cookie.value()))
    }
}

/// Argon2id with a fresh random salt, encoded as a PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(stored: &str, password: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AuthError::Hash(e.to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}
