//! # ash-db-memory
//!
//! `DashMap`-backed implementation of every repository port. Nothing
//! survives a restart; used for local development and the API tests.

use std::collections::HashMap;

use ash_core::models::{
    ActionType, AnalyticsEvent, EventCount, Item, RateLimitRecord, User,
};
use ash_core::traits::{AnalyticsRepo, ItemRepo, RateLimitRepo, UserRepo};
use ash_core::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

type RecordKey = (Uuid, ActionType, Option<Uuid>);

const DUPLICATE_EMAIL: &str = "an account with this email already exists";

#[derive(Default)]
pub struct MemoryStore {
    items: DashMap<Uuid, Item>,
    users: DashMap<Uuid, User>,
    /// lower-cased email -> user id
    emails: DashMap<String, Uuid>,
    rate_limits: DashMap<RecordKey, RateLimitRecord>,
    events: DashMap<Uuid, AnalyticsEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ItemRepo for MemoryStore {
    async fn create_item(&self, item: Item) -> anyhow::Result<()> {
        if self.items.contains_key(&item.id) {
            anyhow::bail!("item {} already exists", item.id);
        }
        self.items.insert(item.id, item);
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> anyhow::Result<Option<Item>> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_items(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Item>> {
        let mut all: Vec<Item> = self.items.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all
            .into_iter()
            .skip(usize::try_from(offset)?)
            .take(usize::try_from(limit)?)
            .collect())
    }

    async fn save_item(&self, item: &Item) -> anyhow::Result<bool> {
        match self.items.get_mut(&item.id) {
            Some(mut slot) => {
                *slot = item.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        if let Some(email) = &user.email {
            // entry() holds the shard lock, so two registrations cannot both win
            match self.emails.entry(email.clone()) {
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    return Err(AppError::Conflict(DUPLICATE_EMAIL.into()).into())
                }
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    slot.insert(user.id);
                }
            }
        }
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let Some(id) = self.emails.get(email).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.get_user(id).await
    }
}

#[async_trait]
impl RateLimitRepo for MemoryStore {
    async fn find_record(
        &self,
        user_id: Uuid,
        action: ActionType,
        item_id: Option<Uuid>,
    ) -> anyhow::Result<Option<RateLimitRecord>> {
        Ok(self
            .rate_limits
            .get(&(user_id, action, item_id))
            .map(|entry| entry.value().clone()))
    }

    async fn latest_record(
        &self,
        user_id: Uuid,
        action: ActionType,
    ) -> anyhow::Result<Option<RateLimitRecord>> {
        Ok(self
            .rate_limits
            .iter()
            .filter(|entry| entry.user_id == user_id && entry.action == action)
            .max_by_key(|entry| entry.last_action)
            .map(|entry| entry.value().clone()))
    }

    async fn upsert_record(&self, record: RateLimitRecord) -> anyhow::Result<()> {
        self.rate_limits
            .insert((record.user_id, record.action, record.item_id), record);
        Ok(())
    }

    async fn prune_before(&self, action: ActionType, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let before = self.rate_limits.len();
        self.rate_limits
            .retain(|_, record| !(record.action == action && record.last_action < cutoff));
        Ok((before - self.rate_limits.len()) as u64)
    }
}

#[async_trait]
impl AnalyticsRepo for MemoryStore {
    async fn record_event(&self, event: AnalyticsEvent) -> anyhow::Result<()> {
        self.events.insert(event.id, event);
        Ok(())
    }

    async fn summarize(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<EventCount>> {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for event in self.events.iter().filter(|e| e.occurred_at >= since) {
            *counts.entry(event.name.clone()).or_default() += 1;
        }
        let mut summary: Vec<EventCount> = counts
            .into_iter()
            .map(|(name, count)| EventCount { name, count })
            .collect();
        summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash_core::models::AuthKind;
    use chrono::Duration;

    #[tokio::test]
    async fn test_email_index_rejects_duplicates() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::now_v7(),
            email: Some("sam@example.com".into()),
            display_name: "Sam".into(),
            password_hash: None,
            auth_kind: AuthKind::Password,
            created_at: Utc::now(),
        };
        store.create_user(user.clone()).await.unwrap();
        assert_eq!(
            store.find_by_email("sam@example.com").await.unwrap().map(|u| u.id),
            Some(user.id)
        );
        let dup = User {
            id: Uuid::now_v7(),
            ..user
        };
        let err = store.create_user(dup).await.unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_latest_record_and_prune() {
        let store = MemoryStore::new();
        let user = Uuid::now_v7();
        let t0 = Utc::now();
        for (hours, item) in [(0, Uuid::now_v7()), (5, Uuid::now_v7())] {
            store
                .upsert_record(RateLimitRecord::new(
                    user,
                    None,
                    ActionType::Post,
                    Some(item),
                    t0 + Duration::hours(hours),
                ))
                .await
                .unwrap();
        }
        store
            .upsert_record(RateLimitRecord::new(user, None, ActionType::Comment, None, t0))
            .await
            .unwrap();

        let latest = store.latest_record(user, ActionType::Post).await.unwrap().unwrap();
        assert_eq!(latest.last_action, t0 + Duration::hours(5));

        let pruned = store
            .prune_before(ActionType::Comment, t0 + Duration::days(31))
            .await
            .unwrap();
        assert_eq!(pruned, 1);
        assert_eq!(store.rate_limits.len(), 2);
    }
}
