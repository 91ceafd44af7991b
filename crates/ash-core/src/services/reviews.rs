//! Review, comment and vote workflows over item documents.
//!
//! Every mutation loads the item, changes the embedded tree, recomputes the
//! aggregate rating and writes the whole document back.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{ActionType, Author, Comment, Item, Post, VoteDirection, Votes};
use crate::services::rate_limit::RateLimitService;
use crate::services::rating::{refresh_item_rating, should_comment_affect_rating, RatingSummary, MAX_RATING};
use crate::traits::ItemRepo;

pub const MAX_REVIEW_CHARS: usize = 5000;
pub const MAX_COMMENT_CHARS: usize = 2000;
pub const MAX_ITEM_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub content: String,
    pub rating: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub content: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub post: Post,
    pub item_rating: RatingSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentOutcome {
    pub comment: Comment,
    /// First comment by this user on the item
    pub first_comment: bool,
    pub item_rating: RatingSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoteOutcome {
    pub score: i64,
    pub up: usize,
    pub down: usize,
}

impl From<&Votes> for VoteOutcome {
    fn from(votes: &Votes) -> Self {
        Self {
            score: votes.score(),
            up: votes.up.len(),
            down: votes.down.len(),
        }
    }
}

#[derive(Clone)]
pub struct ReviewService {
    items: Arc<dyn ItemRepo>,
    limits: RateLimitService,
}

impl ReviewService {
    pub fn new(items: Arc<dyn ItemRepo>, limits: RateLimitService) -> Self {
        Self { items, limits }
    }

    pub fn limits(&self) -> &RateLimitService {
        &self.limits
    }

    pub async fn create_item(&self, new: NewItem) -> Result<Item> {
        let name = required_text("name", &new.name, MAX_ITEM_NAME_CHARS)?;
        let brand = optional_text("brand", &new.brand, MAX_ITEM_NAME_CHARS)?;
        let description = optional_text("description", &new.description, MAX_DESCRIPTION_CHARS)?;

        let item = Item::new(name, brand, description);
        self.items.create_item(item.clone()).await?;
        tracing::info!(item_id = %item.id, name = %item.name, "item created");
        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<Item> {
        self.items
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item", item_id))
    }

    pub async fn list_items(&self, limit: i64, offset: i64) -> Result<Vec<Item>> {
        if !(1..=100).contains(&limit) || offset < 0 {
            return Err(AppError::validation("limit must be 1-100 and offset non-negative"));
        }
        Ok(self.items.list_items(limit, offset).await?)
    }

    pub async fn add_review(&self, author: &Author, item_id: Uuid, new: NewReview) -> Result<ReviewOutcome> {
        let content = required_text("review", &new.content, MAX_REVIEW_CHARS)?;
        let rating = validate_rating(new.rating)?;

        let mut item = self.get_item(item_id).await?;
        self.limits
            .check_post_limit(author.user_id, item_id)
            .await
            .into_result(ActionType::Post)?;

        let post = Post {
            id: Uuid::now_v7(),
            author: author.clone(),
            content,
            rating,
            comments: Vec::new(),
            votes: Votes::default(),
            created_at: Utc::now(),
        };
        item.posts.push(post.clone());
        let item_rating = refresh_item_rating(&mut item);
        self.save(&item).await?;

        self.limits
            .record_post(author.user_id, author.email.as_deref(), item_id)
            .await;
        tracing::info!(%item_id, post_id = %post.id, user_id = %author.user_id, "review added");

        Ok(ReviewOutcome { post, item_rating })
    }

    pub async fn add_comment(
        &self,
        author: &Author,
        item_id: Uuid,
        post_id: Uuid,
        new: NewComment,
    ) -> Result<CommentOutcome> {
        let content = required_text("comment", &new.content, MAX_COMMENT_CHARS)?;
        let rating = match new.rating {
            Some(r) => validate_rating(r)?,
            None => 0.0,
        };

        let mut item = self.get_item(item_id).await?;
        let post = item
            .post(post_id)
            .ok_or_else(|| AppError::not_found("Review", post_id))?;
        if let Some(parent_id) = new.parent_id {
            if !post.comments.iter().any(|c| c.id == parent_id) {
                return Err(AppError::not_found("Comment", parent_id));
            }
        }

        self.limits
            .check_comment_limit(author.user_id)
            .await
            .into_result(ActionType::Comment)?;
        let first_comment = self.limits.check_first_comment(author.user_id, item_id).await;

        let mut comment = Comment {
            id: Uuid::now_v7(),
            author: author.clone(),
            content,
            rating,
            parent_id: new.parent_id,
            votes: Votes::default(),
            created_at: Utc::now(),
        };
        if comment.rating > 0.0 && !should_comment_affect_rating(&comment, first_comment) {
            comment.rating = 0.0;
        }

        item.post_mut(post_id)
            .ok_or_else(|| AppError::not_found("Review", post_id))?
            .comments
            .push(comment.clone());
        let item_rating = refresh_item_rating(&mut item);
        self.save(&item).await?;

        self.limits
            .record_comment(author.user_id, author.email.as_deref(), item_id)
            .await;
        tracing::info!(
            %item_id,
            %post_id,
            comment_id = %comment.id,
            user_id = %author.user_id,
            first_comment,
            "comment added"
        );

        Ok(CommentOutcome {
            comment,
            first_comment,
            item_rating,
        })
    }

    pub async fn vote_post(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        post_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteOutcome> {
        let mut item = self.get_item(item_id).await?;
        let post = item
            .post_mut(post_id)
            .ok_or_else(|| AppError::not_found("Review", post_id))?;
        post.votes.apply(user_id, direction);
        let outcome = VoteOutcome::from(&post.votes);
        self.save(&item).await?;
        Ok(outcome)
    }

    pub async fn vote_comment(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
        direction: VoteDirection,
    ) -> Result<VoteOutcome> {
        let mut item = self.get_item(item_id).await?;
        let comment = item
            .post_mut(post_id)
            .ok_or_else(|| AppError::not_found("Review", post_id))?
            .comment_mut(comment_id)
            .ok_or_else(|| AppError::not_found("Comment", comment_id))?;
        comment.votes.apply(user_id, direction);
        let outcome = VoteOutcome::from(&comment.votes);
        self.save(&item).await?;
        Ok(outcome)
    }

    /// Deletes a review and its comments. The "already reviewed" record stays.
    pub async fn delete_post(&self, user_id: Uuid, item_id: Uuid, post_id: Uuid) -> Result<RatingSummary> {
        let mut item = self.get_item(item_id).await?;
        let post = item
            .post(post_id)
            .ok_or_else(|| AppError::not_found("Review", post_id))?;
        if post.author.user_id != user_id {
            return Err(AppError::Forbidden("you can only delete your own reviews".into()));
        }

        item.posts.retain(|p| p.id != post_id);
        let summary = refresh_item_rating(&mut item);
        self.save(&item).await?;
        tracing::info!(%item_id, %post_id, %user_id, "review deleted");
        Ok(summary)
    }

    /// Deletes a comment and every reply beneath it.
    pub async fn delete_comment(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<RatingSummary> {
        let mut item = self.get_item(item_id).await?;
        let post = item
            .post_mut(post_id)
            .ok_or_else(|| AppError::not_found("Review", post_id))?;
        let owner = post
            .comment_mut(comment_id)
            .map(|c| c.author.user_id)
            .ok_or_else(|| AppError::not_found("Comment", comment_id))?;
        if owner != user_id {
            return Err(AppError::Forbidden("you can only delete your own comments".into()));
        }

        let removed = post.remove_comment_tree(comment_id);
        let summary = refresh_item_rating(&mut item);
        self.save(&item).await?;
        tracing::info!(%item_id, %post_id, %comment_id, removed, "comment deleted");
        Ok(summary)
    }

    async fn save(&self, item: &Item) -> Result<()> {
        if self.items.save_item(item).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Item", item.id))
        }
    }
}

fn validate_rating(rating: f64) -> Result<f64> {
    if rating.is_finite() && (0.0..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(AppError::validation("rating must be between 0 and 5"))
    }
}

fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} cannot be empty")));
    }
    optional_text(field, trimmed, max_chars)
}

fn optional_text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_chars {
        return Err(AppError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}
