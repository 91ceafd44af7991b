//! # ash-db-sqlite Implementation
//!
//! Maps the `ash-core` ports onto SQLite. Items keep their document shape:
//! the whole review/comment tree is one JSON column, so a save is a single
//! row update. Timestamps are stored as Unix milliseconds so they sort as
//! integers.

use std::collections::BTreeSet;
use std::str::FromStr;

use anyhow::Context;
use ash_core::models::{
    ActionType, AnalyticsEvent, AuthKind, EventCount, Item, RateLimitRecord, User,
};
use ash_core::traits::{AnalyticsRepo, ItemRepo, RateLimitRepo, UserRepo};
use ash_core::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::types::Json;
use sqlx::Row;
use uuid::Uuid;

/// One pool serving every repository port.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects and applies pending migrations.
    ///
    /// In-memory databases are pinned to a single, never-recycled connection;
    /// every new connection to `:memory:` would otherwise see an empty database.
    pub async fn new(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true);

        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(in_memory, "sqlite store ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(millis: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).with_context(|| format!("timestamp out of range: {millis}"))
}

fn parse_uuid(raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("malformed id {raw:?}"))
}

/// '' stands in for "no item" so the column can be part of the primary key.
fn item_key(item_id: Option<Uuid>) -> String {
    item_id.map(|id| id.to_string()).unwrap_or_default()
}

fn auth_kind_str(kind: AuthKind) -> &'static str {
    match kind {
        AuthKind::Password => "password",
        AuthKind::Google => "google",
    }
}

fn row_to_user(row: &SqliteRow) -> anyhow::Result<User> {
    let auth_kind = match row.try_get::<String, _>("auth_kind")?.as_str() {
        "password" => AuthKind::Password,
        "google" => AuthKind::Google,
        other => anyhow::bail!("unknown auth kind {other:?}"),
    };
    Ok(User {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        email: row.try_get("email")?,
        display_name: row.try_get("display_name")?,
        password_hash: row.try_get("password_hash")?,
        auth_kind,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}

fn row_to_record(row: &SqliteRow) -> anyhow::Result<RateLimitRecord> {
    let item_id: String = row.try_get("item_id")?;
    let action: String = row.try_get("action")?;
    let first_comment_items: Json<BTreeSet<Uuid>> = row.try_get("first_comment_items")?;
    Ok(RateLimitRecord {
        user_id: parse_uuid(&row.try_get::<String, _>("user_id")?)?,
        user_email: row.try_get("user_email")?,
        action: ActionType::from_str(&action).map_err(anyhow::Error::msg)?,
        item_id: if item_id.is_empty() {
            None
        } else {
            Some(parse_uuid(&item_id)?)
        },
        last_action: from_millis(row.try_get("last_action")?)?,
        action_count: u32::try_from(row.try_get::<i64, _>("action_count")?)?,
        first_comment_items: first_comment_items.0,
    })
}

#[async_trait]
impl ItemRepo for SqliteStore {
    async fn create_item(&self, item: Item) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO items (id, name, created_at, body) VALUES (?, ?, ?, ?)")
            .bind(item.id.to_string())
            .bind(&item.name)
            .bind(to_millis(item.created_at))
            .bind(Json(&item))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        let row = sqlx::query("SELECT body FROM items WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get::<Json<Item>, _>("body")?.0)),
            None => Ok(None),
        }
    }

    async fn list_items(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Item>> {
        let rows = sqlx::query("SELECT body FROM items ORDER BY name ASC, id ASC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<Item> { Ok(row.try_get::<Json<Item>, _>("body")?.0) })
            .collect()
    }

    async fn save_item(&self, item: &Item) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE items SET name = ?, body = ? WHERE id = ?")
            .bind(&item.name)
            .bind(Json(item))
            .bind(item.id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepo for SqliteStore {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, display_name, password_hash, auth_kind, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(auth_kind_str(user.auth_kind))
        .bind(to_millis(user.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("an account with this email already exists".into()).into()
            }
            other => anyhow::Error::from(other),
        })?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_user)
            .transpose()
    }
}

#[async_trait]
impl RateLimitRepo for SqliteStore {
    async fn find_record(
        &self,
        user_id: Uuid,
        action: ActionType,
        item_id: Option<Uuid>,
    ) -> anyhow::Result<Option<RateLimitRecord>> {
        sqlx::query("SELECT * FROM rate_limits WHERE user_id = ? AND action = ? AND item_id = ?")
            .bind(user_id.to_string())
            .bind(action.as_str())
            .bind(item_key(item_id))
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(row_to_record)
            .transpose()
    }

    async fn latest_record(
        &self,
        user_id: Uuid,
        action: ActionType,
    ) -> anyhow::Result<Option<RateLimitRecord>> {
        sqlx::query(
            "SELECT * FROM rate_limits WHERE user_id = ? AND action = ? \
             ORDER BY last_action DESC LIMIT 1",
        )
        .bind(user_id.to_string())
        .bind(action.as_str())
        .fetch_optional(&self.pool)
        .await?
        .as_ref()
        .map(row_to_record)
        .transpose()
    }

    async fn upsert_record(&self, record: RateLimitRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO rate_limits \
                (user_id, user_email, action, item_id, last_action, action_count, first_comment_items) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (user_id, action, item_id) DO UPDATE SET \
                user_email = excluded.user_email, \
                last_action = excluded.last_action, \
                action_count = excluded.action_count, \
                first_comment_items = excluded.first_comment_items",
        )
        .bind(record.user_id.to_string())
        .bind(&record.user_email)
        .bind(record.action.as_str())
        .bind(item_key(record.item_id))
        .bind(to_millis(record.last_action))
        .bind(i64::from(record.action_count))
        .bind(Json(&record.first_comment_items))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn prune_before(&self, action: ActionType, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM rate_limits WHERE action = ? AND last_action < ?")
            .bind(action.as_str())
            .bind(to_millis(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AnalyticsRepo for SqliteStore {
    async fn record_event(&self, event: AnalyticsEvent) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO analytics_events (id, name, item_id, user_id, occurred_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(&event.name)
        .bind(event.item_id.map(|id| id.to_string()))
        .bind(event.user_id.map(|id| id.to_string()))
        .bind(to_millis(event.occurred_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn summarize(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<EventCount>> {
        let rows = sqlx::query(
            "SELECT name, COUNT(*) AS count FROM analytics_events WHERE occurred_at >= ? \
             GROUP BY name ORDER BY count DESC, name ASC",
        )
        .bind(to_millis(since))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> anyhow::Result<EventCount> {
                Ok(EventCount {
                    name: row.try_get("name")?,
                    count: u64::try_from(row.try_get::<i64, _>("count")?)?,
                })
            })
            .collect()
    }
}
