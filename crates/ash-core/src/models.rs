//! # Domain Models
//!
//! These structs represent the core entities of Ashtray.
//! We use UUID v7 for time-ordered, globally unique identification.
//!
//! An [`Item`] is stored as a single document: its reviews, their comments
//! and all votes are embedded, and `rating` / `review_count` are derived
//! from that tree whenever it changes.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an account signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    Password,
    Google,
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Lower-cased; may be absent for externally authenticated accounts
    pub email: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub auth_kind: AuthKind,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn author(&self) -> Author {
        Author {
            user_id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// Who wrote a review or comment, denormalized into the item document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub display_name: String,
}

impl Author {
    /// Identity used when de-duplicating comment ratings: email, else display name.
    pub fn rating_key(&self) -> &str {
        match self.email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ => &self.display_name,
        }
    }
}

/// The reviewable product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub description: String,
    /// Derived aggregate, one decimal place
    pub rating: f64,
    /// Number of entries that contributed to `rating`
    pub review_count: u32,
    pub posts: Vec<Post>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: String, brand: String, description: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            name,
            brand,
            description,
            rating: 0.0,
            review_count: 0,
            posts: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn post(&self, post_id: Uuid) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    pub fn post_mut(&mut self, post_id: Uuid) -> Option<&mut Post> {
        self.posts.iter_mut().find(|p| p.id == post_id)
    }
}

/// A review of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author: Author,
    pub content: String,
    /// 0.0 to 5.0; 0 means "no rating"
    pub rating: f64,
    pub comments: Vec<Comment>,
    pub votes: Votes,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn comment_mut(&mut self, comment_id: Uuid) -> Option<&mut Comment> {
        self.comments.iter_mut().find(|c| c.id == comment_id)
    }

    /// Removes a comment together with every reply beneath it.
    /// Returns the number of comments removed.
    pub fn remove_comment_tree(&mut self, comment_id: Uuid) -> usize {
        let mut doomed: HashSet<Uuid> = HashSet::from([comment_id]);
        // Replies always come after their parent in insertion order.
        for c in &self.comments {
            if let Some(parent) = c.parent_id {
                if doomed.contains(&parent) {
                    doomed.insert(c.id);
                }
            }
        }
        let before = self.comments.len();
        self.comments.retain(|c| !doomed.contains(&c.id));
        before - self.comments.len()
    }
}

/// A comment on a review, or a reply to another comment when `parent_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub author: Author,
    pub content: String,
    /// 0.0 to 5.0; 0 means "no rating"
    pub rating: f64,
    pub parent_id: Option<Uuid>,
    pub votes: Votes,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
    Clear,
}

/// One vote per user per target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Votes {
    pub up: BTreeSet<Uuid>,
    pub down: BTreeSet<Uuid>,
}

impl Votes {
    pub fn apply(&mut self, user_id: Uuid, direction: VoteDirection) {
        self.up.remove(&user_id);
        self.down.remove(&user_id);
        match direction {
            VoteDirection::Up => {
                self.up.insert(user_id);
            }
            VoteDirection::Down => {
                self.down.insert(user_id);
            }
            VoteDirection::Clear => {}
        }
    }

    pub fn score(&self) -> i64 {
        self.up.len() as i64 - self.down.len() as i64
    }
}

/// The kind of action a rate-limit record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Post,
    Comment,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Post => "post",
            ActionType::Comment => "comment",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(ActionType::Post),
            "comment" => Ok(ActionType::Comment),
            other => Err(format!("unknown action type: {other}")),
        }
    }
}

/// Persistent per-user bookkeeping behind the cooldown checks.
///
/// Post records are keyed by (user, item); there is a single comment record
/// per user with `item_id == None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub user_id: Uuid,
    pub user_email: Option<String>,
    pub action: ActionType,
    pub item_id: Option<Uuid>,
    pub last_action: DateTime<Utc>,
    pub action_count: u32,
    /// Items this user has already commented on
    pub first_comment_items: BTreeSet<Uuid>,
}

impl RateLimitRecord {
    pub fn new(
        user_id: Uuid,
        user_email: Option<String>,
        action: ActionType,
        item_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            user_email,
            action,
            item_id,
            last_action: now,
            action_count: 0,
            first_comment_items: BTreeSet::new(),
        }
    }
}

/// A marketing analytics event (page view, outbound click, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub name: String,
    pub item_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub name: String,
    pub count: u64,
}
