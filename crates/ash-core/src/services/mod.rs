//! Application services. Each one owns its ports and is cheap to clone.

pub mod accounts;
pub mod analytics;
pub mod rate_limit;
pub mod rating;
pub mod reviews;

pub use accounts::{AccountService, Registration};
pub use analytics::AnalyticsService;
pub use rate_limit::{RateLimitDecision, RateLimitPolicy, RateLimitService, RateLimitStatus};
pub use rating::{calculate_overall_rating, should_comment_affect_rating, RatingSummary};
pub use reviews::{
    CommentOutcome, NewComment, NewItem, NewReview, ReviewOutcome, ReviewService, VoteOutcome,
};
