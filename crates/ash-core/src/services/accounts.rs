//! Password accounts: registration and login.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{AuthKind, User};
use crate::traits::{AuthProvider, IssuedToken, UserRepo};

const MIN_PASSWORD_CHARS: usize = 8;
const MAX_PASSWORD_CHARS: usize = 128;
const MAX_EMAIL_CHARS: usize = 254;
const MAX_DISPLAY_NAME_CHARS: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepo>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { users, auth }
    }

    pub async fn register(&self, reg: Registration) -> Result<(User, IssuedToken)> {
        let email = normalize_email(&reg.email)?;
        let password_len = reg.password.chars().count();
        if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&password_len) {
            return Err(AppError::validation(format!(
                "password must be {MIN_PASSWORD_CHARS}-{MAX_PASSWORD_CHARS} characters"
            )));
        }
        let display_name = reg.display_name.trim();
        if display_name.is_empty() || display_name.chars().count() > MAX_DISPLAY_NAME_CHARS {
            return Err(AppError::validation(format!(
                "display name must be 1-{MAX_DISPLAY_NAME_CHARS} characters"
            )));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("an account with this email already exists".into()));
        }

        let hash = self.auth.hash_password(&reg.password).await?;
        let user = User {
            id: Uuid::now_v7(),
            email: Some(email),
            display_name: display_name.to_string(),
            password_hash: Some(hash),
            auth_kind: AuthKind::Password,
            created_at: Utc::now(),
        };
        self.users.create_user(user.clone()).await?;
        tracing::info!(user_id = %user.id, "account registered");

        let token = self.auth.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, IssuedToken)> {
        let invalid = || AppError::Unauthorized("invalid credentials".into());
        let email = normalize_email(email).map_err(|_| invalid())?;

        let user = self.users.find_by_email(&email).await?.ok_or_else(invalid)?;
        let Some(hash) = user.password_hash.as_deref() else {
            return Err(invalid());
        };
        if !self.auth.verify_password(password, hash).await {
            tracing::warn!(user_id = %user.id, "failed login attempt");
            return Err(invalid());
        }

        let token = self.auth.issue_token(&user)?;
        Ok((user, token))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    let valid = email.len() <= MAX_EMAIL_CHARS
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(AppError::validation("a valid email address is required"))
    }
}
