//! # Rate limiting
//!
//! Per-user cooldowns backed by [`RateLimitRepo`]:
//!
//! - one review per user per item, ever;
//! - a cooldown between any two reviews by the same user (48h by default);
//! - a cooldown between comments (7 minutes by default).
//!
//! Storage failures never block a user: every check logs the failure and
//! allows the action.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ActionType, RateLimitRecord};
use crate::traits::RateLimitRepo;

/// Cooldown windows applied by [`RateLimitService`].
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub post_cooldown: Duration,
    pub comment_cooldown: Duration,
    /// Comment records idle for longer than this are pruned.
    pub comment_retention: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            post_cooldown: Duration::hours(48),
            comment_cooldown: Duration::minutes(7),
            comment_retention: Duration::days(30),
        }
    }
}

/// Outcome of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    AlreadyReviewed,
    CoolingDown { remaining: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed)
    }

    /// Seconds to wait, rounded up. Zero unless cooling down.
    pub fn wait_secs(&self) -> u64 {
        match self {
            RateLimitDecision::CoolingDown { remaining } => ceil_secs(*remaining),
            _ => 0,
        }
    }

    /// Converts a denial into the 429 error surfaced to clients.
    pub fn into_result(self, action: ActionType) -> crate::error::Result<()> {
        match self {
            RateLimitDecision::Allowed => Ok(()),
            RateLimitDecision::AlreadyReviewed => Err(AppError::RateLimitExceeded {
                message: "you have already reviewed this item".to_string(),
                retry_after_secs: None,
            }),
            RateLimitDecision::CoolingDown { remaining } => {
                let secs = ceil_secs(remaining);
                Err(AppError::RateLimitExceeded {
                    message: format!(
                        "please wait {} before your next {action}",
                        describe_wait(secs)
                    ),
                    retry_after_secs: Some(secs),
                })
            }
        }
    }
}

/// Combined view returned by the status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub can_post: bool,
    pub already_reviewed: bool,
    pub post_wait_secs: u64,
    pub can_comment: bool,
    pub comment_wait_secs: u64,
}

#[derive(Clone)]
pub struct RateLimitService {
    repo: Arc<dyn RateLimitRepo>,
    policy: RateLimitPolicy,
}

impl RateLimitService {
    pub fn new(repo: Arc<dyn RateLimitRepo>, policy: RateLimitPolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub async fn check_post_limit(&self, user_id: Uuid, item_id: Uuid) -> RateLimitDecision {
        self.check_post_limit_at(user_id, item_id, Utc::now()).await
    }

    pub async fn check_post_limit_at(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        match self.repo.find_record(user_id, ActionType::Post, Some(item_id)).await {
            Ok(Some(_)) => return RateLimitDecision::AlreadyReviewed,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%user_id, %item_id, error = %e, "post limit lookup failed, allowing");
                return RateLimitDecision::Allowed;
            }
        }

        match self.repo.latest_record(user_id, ActionType::Post).await {
            Ok(latest) => cooldown(latest.as_ref(), self.policy.post_cooldown, now),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "post cooldown lookup failed, allowing");
                RateLimitDecision::Allowed
            }
        }
    }

    pub async fn check_comment_limit(&self, user_id: Uuid) -> RateLimitDecision {
        self.check_comment_limit_at(user_id, Utc::now()).await
    }

    pub async fn check_comment_limit_at(&self, user_id: Uuid, now: DateTime<Utc>) -> RateLimitDecision {
        match self.repo.latest_record(user_id, ActionType::Comment).await {
            Ok(latest) => cooldown(latest.as_ref(), self.policy.comment_cooldown, now),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "comment cooldown lookup failed, allowing");
                RateLimitDecision::Allowed
            }
        }
    }

    /// `true` if the user has never commented on this item.
    pub async fn check_first_comment(&self, user_id: Uuid, item_id: Uuid) -> bool {
        match self.repo.find_record(user_id, ActionType::Comment, None).await {
            Ok(Some(record)) => !record.first_comment_items.contains(&item_id),
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(%user_id, %item_id, error = %e, "first comment lookup failed");
                true
            }
        }
    }

    pub async fn record_post(&self, user_id: Uuid, user_email: Option<&str>, item_id: Uuid) {
        self.record_post_at(user_id, user_email, item_id, Utc::now()).await
    }

    pub async fn record_post_at(
        &self,
        user_id: Uuid,
        user_email: Option<&str>,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) {
        self.record(user_id, user_email, ActionType::Post, Some(item_id), None, now)
            .await
    }

    pub async fn record_comment(&self, user_id: Uuid, user_email: Option<&str>, item_id: Uuid) {
        self.record_comment_at(user_id, user_email, item_id, Utc::now()).await
    }

    pub async fn record_comment_at(
        &self,
        user_id: Uuid,
        user_email: Option<&str>,
        item_id: Uuid,
        now: DateTime<Utc>,
    ) {
        self.record(user_id, user_email, ActionType::Comment, None, Some(item_id), now)
            .await
    }

    async fn record(
        &self,
        user_id: Uuid,
        user_email: Option<&str>,
        action: ActionType,
        key_item: Option<Uuid>,
        commented_item: Option<Uuid>,
        now: DateTime<Utc>,
    ) {
        let existing = match self.repo.find_record(user_id, action, key_item).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(%user_id, %action, error = %e, "rate limit record lookup failed");
                None
            }
        };

        let mut record = existing.unwrap_or_else(|| {
            RateLimitRecord::new(user_id, user_email.map(str::to_string), action, key_item, now)
        });
        record.last_action = now;
        record.action_count += 1;
        if user_email.is_some() {
            record.user_email = user_email.map(str::to_string);
        }
        if let Some(item_id) = commented_item {
            record.first_comment_items.insert(item_id);
        }

        if let Err(e) = self.repo.upsert_record(record).await {
            tracing::warn!(%user_id, %action, error = %e, "failed to record rate limited action");
        }
    }

    pub async fn status(&self, user_id: Uuid, item_id: Option<Uuid>) -> RateLimitStatus {
        self.status_at(user_id, item_id, Utc::now()).await
    }

    pub async fn status_at(
        &self,
        user_id: Uuid,
        item_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> RateLimitStatus {
        let post = match item_id {
            Some(item_id) => self.check_post_limit_at(user_id, item_id, now).await,
            None => match self.repo.latest_record(user_id, ActionType::Post).await {
                Ok(latest) => cooldown(latest.as_ref(), self.policy.post_cooldown, now),
                Err(e) => {
                    tracing::warn!(%user_id, error = %e, "post cooldown lookup failed, allowing");
                    RateLimitDecision::Allowed
                }
            },
        };
        let comment = self.check_comment_limit_at(user_id, now).await;

        RateLimitStatus {
            can_post: post.is_allowed(),
            already_reviewed: post == RateLimitDecision::AlreadyReviewed,
            post_wait_secs: post.wait_secs(),
            can_comment: comment.is_allowed(),
            comment_wait_secs: comment.wait_secs(),
        }
    }

    /// Drops comment records idle for longer than the retention window.
    pub async fn prune_inactive_comments(&self) -> anyhow::Result<u64> {
        self.prune_inactive_comments_at(Utc::now()).await
    }

    pub async fn prune_inactive_comments_at(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let cutoff = now
            .checked_sub_signed(self.policy.comment_retention)
            .ok_or_else(|| anyhow::anyhow!("comment retention window overflows the calendar"))?;
        let pruned = self.repo.prune_before(ActionType::Comment, cutoff).await?;
        if pruned > 0 {
            tracing::info!(pruned, %cutoff, "pruned inactive comment rate limit records");
        }
        Ok(pruned)
    }
}

fn cooldown(
    latest: Option<&RateLimitRecord>,
    window: Duration,
    now: DateTime<Utc>,
) -> RateLimitDecision {
    let Some(record) = latest else {
        return RateLimitDecision::Allowed;
    };
    let elapsed = now - record.last_action;
    if elapsed >= window {
        RateLimitDecision::Allowed
    } else {
        RateLimitDecision::CoolingDown {
            remaining: window - elapsed,
        }
    }
}

fn ceil_secs(d: Duration) -> u64 {
    let millis = d.num_milliseconds().max(0) as u64;
    millis.div_ceil(1000)
}

fn describe_wait(secs: u64) -> String {
    let total_minutes = secs.div_ceil(60);
    let (hours, minutes) = (total_minutes / 60, total_minutes % 60);
    match (hours, minutes) {
        (0, 0) => format!("{secs} seconds"),
        (0, m) => format!("{m} minute(s)"),
        (h, 0) => format!("{h} hour(s)"),
        (h, m) => format!("{h} hour(s) {m} minute(s)"),
    }
}
