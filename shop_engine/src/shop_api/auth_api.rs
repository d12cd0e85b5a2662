//! Registration, login and sessions.
//!
//! An access token is an opaque random string. The session it stands for lives in the cache under
//! `session:{token}`, and the user's latest token under `token:{user_id}`. Both expire on their own.

use std::{fmt::Debug, time::Duration};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use log::*;
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    cache::{ttl, CacheBackend, ShopCache},
    db_types::{NewUser, Role, SessionData, User},
    shop_api::{best_effort, errors::ShopError},
    traits::AccountManagement,
};

pub const TOKEN_LENGTH: usize = 48;

/// One-way password hashing.
pub trait PasswordHasher: Clone + Send + Sync {
    fn hash(&self, password: &str) -> Result<String, ShopError>;

    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Argon2id with the crate's default parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, ShopError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ShopError::Unexpected(format!("Could not hash password: {e}")))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(e) => {
                warn!("🔑️ Stored password hash is malformed: {e}");
                false
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub user_id: i64,
    pub role: Role,
}

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

/// Trims and lowercases the address, and checks that it looks like one.
pub fn normalize_email(email: &str) -> Result<String, ShopError> {
    let email = email.trim().to_lowercase();
    if EMAIL.is_match(&email) {
        Ok(email)
    } else {
        Err(ShopError::InvalidInput(format!("'{email}' is not a valid email address")))
    }
}

fn new_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(TOKEN_LENGTH).map(char::from).collect()
}

pub struct AuthApi<B, C, H = Argon2Hasher> {
    db: B,
    cache: ShopCache<C>,
    hasher: H,
    session_ttl: Duration,
}

impl<B: Debug, C, H> Debug for AuthApi<B, C, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuthApi ({:?})", self.db)
    }
}

impl<B, C> AuthApi<B, C, Argon2Hasher>
where
    B: AccountManagement,
    C: CacheBackend,
{
    pub fn new(db: B, cache: C) -> Self {
        Self { db, cache: ShopCache::new(cache), hasher: Argon2Hasher, session_ttl: ttl::SESSION }
    }
}

impl<B, C, H> AuthApi<B, C, H>
where
    B: AccountManagement,
    C: CacheBackend,
    H: PasswordHasher,
{
    pub fn with_hasher<H2: PasswordHasher>(self, hasher: H2) -> AuthApi<B, C, H2> {
        AuthApi { db: self.db, cache: self.cache, hasher, session_ttl: self.session_ttl }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Creates a user account with the given role. Does not log the user in.
    pub async fn create_account(&self, email: &str, password: &str, role: Role) -> Result<User, ShopError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(ShopError::InvalidInput("The password must not be empty".to_string()));
        }
        let password_hash = self.hasher.hash(password)?;
        let user = self.db.create_user(NewUser { email, password_hash, role }).await?;
        info!("🔑️ Registered {} as user {} ({})", user.email, user.user_id, user.role);
        Ok(user)
    }

    /// Registers a new customer and logs them in.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthToken, ShopError> {
        let user = self.create_account(email, password, Role::Customer).await?;
        self.start_session(&user).await
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthToken, ShopError> {
        let email = email.trim().to_lowercase();
        let user = self.db.fetch_user_by_email(&email).await?.ok_or_else(|| {
            debug!("🔑️ Login attempt for unknown address {email}");
            ShopError::AuthFailure
        })?;
        if !self.hasher.verify(password, &user.password_hash) {
            debug!("🔑️ Wrong password for {email}");
            return Err(ShopError::AuthFailure);
        }
        self.start_session(&user).await
    }

    async fn start_session(&self, user: &User) -> Result<AuthToken, ShopError> {
        let access_token = new_token();
        let session =
            SessionData { user_id: user.user_id, email: user.email.clone(), role: user.role, created_at: Utc::now() };
        self.cache.store_session(&access_token, &session, self.session_ttl).await?;
        debug!("🔑️ Session started for user {}", user.user_id);
        Ok(AuthToken { access_token, user_id: user.user_id, role: user.role })
    }

    /// The session behind the token. Unknown and expired tokens are an `AuthFailure`.
    pub async fn get_session(&self, token: &str) -> Result<SessionData, ShopError> {
        self.cache.session(token).await?.ok_or(ShopError::AuthFailure)
    }

    /// The user behind the token, read fresh from the store.
    pub async fn get_profile(&self, token: &str) -> Result<User, ShopError> {
        let session = self.get_session(token).await?;
        self.db.fetch_user(session.user_id).await?.ok_or_else(|| {
            warn!("🔑️ Session for user {} refers to a user that does not exist", session.user_id);
            ShopError::AuthFailure
        })
    }

    /// Ends the session. Logging out twice is harmless.
    pub async fn logout(&self, token: &str) -> Result<(), ShopError> {
        if let Some(Some(session)) = best_effort("read a session", self.cache.session(token)).await {
            self.cache.remove_session(token, session.user_id).await?;
            debug!("🔑️ User {} logged out", session.user_id);
        }
        Ok(())
    }
}
