//! # ash-auth-simple
//!
//! Argon2 + HS256 JWT implementation of `AuthProvider`.
//! Handles password hashing for local accounts and the bearer tokens
//! every authenticated endpoint expects.

use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use ash_core::models::{Author, User};
use ash_core::traits::{AuthProvider, IssuedToken};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: Option<String>,
    name: String,
    iat: i64,
    exp: i64,
}

pub struct SimpleAuthProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl SimpleAuthProvider {
    /// Accepts the signing secret (e.g., from configuration) and token lifetime.
    /// Lifetimes too large for a `Duration` saturate; `issue_token` then fails
    /// instead of overflowing.
    pub fn new(jwt_secret: &str, token_ttl_hours: u64) -> Self {
        let token_ttl = i64::try_from(token_ttl_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        Self {
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
            token_ttl,
        }
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    /// Argon2id with a fresh salt. Runs on the blocking pool; hashing is deliberately slow.
    async fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
        })
        .await?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> bool {
        let password = password.to_string();
        let hash = hash.to_string();
        let verified = tokio::task::spawn_blocking(move || {
            let parsed_hash = match PasswordHash::new(&hash) {
                Ok(p) => p,
                Err(_) => return false,
            };
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .await;

        verified.unwrap_or_else(|e| {
            tracing::error!("password verification task failed: {e}");
            false
        })
    }

    fn issue_token(&self, user: &User) -> anyhow::Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.token_ttl)
            .context("token lifetime overflows the calendar")?;
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.display_name.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify_token(&self, token: &str) -> anyhow::Result<Author> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(Author {
            user_id: Uuid::parse_str(&data.claims.sub)?,
            email: data.claims.email,
            display_name: data.claims.name,
        })
    }
}
