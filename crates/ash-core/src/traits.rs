//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ActionType, AnalyticsEvent, Author, EventCount, Item, RateLimitRecord, User};

/// Document persistence for items and everything embedded in them.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn create_item(&self, item: Item) -> anyhow::Result<()>;
    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<Item>>;
    /// Ordered by name.
    async fn list_items(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Item>>;
    /// Replaces the stored document. Returns `false` if the item no longer exists.
    async fn save_item(&self, item: &Item) -> anyhow::Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Fails with a wrapped [`AppError::Conflict`](crate::error::AppError::Conflict)
    /// when the email is already registered.
    async fn create_user(&self, user: User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
}

/// Storage behind the per-user cooldowns.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait RateLimitRepo: Send + Sync {
    /// Exact lookup by (user, action, item).
    async fn find_record(
        &self,
        user_id: Uuid,
        action: ActionType,
        item_id: Option<Uuid>,
    ) -> anyhow::Result<Option<RateLimitRecord>>;

    /// The user's record of this action type with the newest `last_action`, across items.
    async fn latest_record(
        &self,
        user_id: Uuid,
        action: ActionType,
    ) -> anyhow::Result<Option<RateLimitRecord>>;

    /// Insert or replace by (user, action, item).
    async fn upsert_record(&self, record: RateLimitRecord) -> anyhow::Result<()>;

    /// Deletes records of `action` whose `last_action` is before `cutoff`.
    async fn prune_before(&self, action: ActionType, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait AnalyticsRepo: Send + Sync {
    async fn record_event(&self, event: AnalyticsEvent) -> anyhow::Result<()>;
    /// Event counts since `since`, most frequent first.
    async fn summarize(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<EventCount>>;
}

/// A freshly minted bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Credential contract: password hashing and bearer tokens.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Verifies a password against a stored hash. Malformed hashes verify as `false`.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    fn issue_token(&self, user: &User) -> anyhow::Result<IssuedToken>;

    /// Decodes a bearer token back into the identity it was issued for.
    fn verify_token(&self, token: &str) -> anyhow::Result<Author>;
}
