//! Aggregate rating for an item.
//!
//! Every rated review counts once. Comment ratings count too, but only the
//! most recent rated comment of each user across the whole item; earlier
//! ones are superseded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Comment, Item, Post};

pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub rating: f64,
    pub total_reviews: u32,
}

pub fn calculate_overall_rating(posts: &[Post]) -> RatingSummary {
    let mut sum = 0.0;
    let mut count: u32 = 0;

    for post in posts {
        if post.rating > 0.0 {
            sum += post.rating.min(MAX_RATING);
            count += 1;
        }
    }

    // rating key -> (created_at, rating); ties go to the later entry in document order
    let mut latest: HashMap<&str, (DateTime<Utc>, f64)> = HashMap::new();
    for comment in posts.iter().flat_map(|p| p.comments.iter()) {
        if comment.rating <= 0.0 {
            continue;
        }
        let key = comment.author.rating_key();
        let superseded = latest
            .get(key)
            .is_some_and(|(seen_at, _)| *seen_at > comment.created_at);
        if !superseded {
            latest.insert(key, (comment.created_at, comment.rating.min(MAX_RATING)));
        }
    }
    for (_, rating) in latest.values() {
        sum += rating;
        count += 1;
    }

    if count == 0 {
        return RatingSummary {
            rating: 0.0,
            total_reviews: 0,
        };
    }

    RatingSummary {
        rating: round_one_decimal(sum / f64::from(count)),
        total_reviews: count,
    }
}

/// Recomputes and stores the derived fields of an item.
pub fn refresh_item_rating(item: &mut Item) -> RatingSummary {
    let summary = calculate_overall_rating(&item.posts);
    item.rating = summary.rating;
    item.review_count = summary.total_reviews;
    summary
}

/// Whether a new comment's rating should feed the aggregate.
///
/// Always `true` for now; callers still route through it so a policy
/// (e.g. "first comment per item only") can be switched on in one place.
pub fn should_comment_affect_rating(_comment: &Comment, _is_first_comment: bool) -> bool {
    true
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, Votes};
    use chrono::Duration;
    use uuid::Uuid;

    fn author(email: Option<&str>, name: &str) -> Author {
        Author {
            user_id: Uuid::now_v7(),
            email: email.map(str::to_string),
            display_name: name.to_string(),
        }
    }

    fn post(rating: f64) -> Post {
        Post {
            id: Uuid::now_v7(),
            author: author(None, "op"),
            content: "review".into(),
            rating,
            comments: Vec::new(),
            votes: Votes::default(),
            created_at: Utc::now(),
        }
    }

    fn comment(author: &Author, rating: f64, at: DateTime<Utc>) -> Comment {
        Comment {
            id: Uuid::now_v7(),
            author: author.clone(),
            content: "comment".into(),
            rating,
            parent_id: None,
            votes: Votes::default(),
            created_at: at,
        }
    }

    #[test]
    fn test_empty_item_rates_zero() {
        let summary = calculate_overall_rating(&[]);
        assert_eq!(summary.rating, 0.0);
        assert_eq!(summary.total_reviews, 0);

        // Unrated reviews contribute nothing either.
        let summary = calculate_overall_rating(&[post(0.0), post(0.0)]);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.rating, 0.0);
    }

    #[test]
    fn test_latest_comment_per_user_wins() {
        let a = author(Some("a@example.com"), "Alice");
        let t0 = Utc::now();
        let mut first = post(4.0);
        first.comments.push(comment(&a, 5.0, t0));
        first.comments.push(comment(&a, 2.0, t0 + Duration::minutes(10)));

        let summary = calculate_overall_rating(&[first, post(0.0)]);
        assert_eq!(summary.rating, 3.0);
        assert_eq!(summary.total_reviews, 2);
    }

    #[test]
    fn test_latest_comment_spans_posts() {
        let a = author(Some("a@example.com"), "Alice");
        let t0 = Utc::now();
        let mut first = post(0.0);
        let mut second = post(0.0);
        // Newer comment lives on the first post, older on the second.
        first.comments.push(comment(&a, 1.0, t0 + Duration::hours(1)));
        second.comments.push(comment(&a, 5.0, t0));

        let summary = calculate_overall_rating(&[first, second]);
        assert_eq!(summary.rating, 1.0);
        assert_eq!(summary.total_reviews, 1);
    }

    #[test]
    fn test_users_without_email_are_keyed_by_display_name() {
        let t0 = Utc::now();
        let google_a = author(None, "Sam");
        let google_b = author(None, "Sam");
        let other = author(None, "Kim");
        let mut p = post(0.0);
        p.comments.push(comment(&google_a, 4.0, t0));
        p.comments.push(comment(&google_b, 2.0, t0 + Duration::seconds(1)));
        p.comments.push(comment(&other, 5.0, t0));

        let summary = calculate_overall_rating(&[p]);
        assert_eq!(summary.total_reviews, 2);
        assert_eq!(summary.rating, 3.5);
    }

    #[test]
    fn test_unrated_comments_do_not_supersede() {
        let a = author(Some("a@example.com"), "Alice");
        let t0 = Utc::now();
        let mut p = post(0.0);
        p.comments.push(comment(&a, 3.0, t0));
        p.comments.push(comment(&a, 0.0, t0 + Duration::minutes(8)));

        assert_eq!(calculate_overall_rating(&[p]).rating, 3.0);
    }

    #[test]
    fn test_rating_is_bounded_and_rounded() {
        let t0 = Utc::now();
        let ratings = [0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 7.0];
        for window in 1..ratings.len() {
            let mut posts: Vec<Post> = ratings[..window].iter().map(|r| post(*r)).collect();
            for (i, r) in ratings[window..].iter().enumerate() {
                let who = author(None, &format!("user{i}"));
                posts[0].comments.push(comment(&who, *r, t0));
            }
            let summary = calculate_overall_rating(&posts);
            assert!((0.0..=MAX_RATING).contains(&summary.rating));
            assert_eq!(summary.rating, (summary.rating * 10.0).round() / 10.0);
        }

        let summary = calculate_overall_rating(&[post(4.0), post(4.0), post(5.0)]);
        assert_eq!(summary.rating, 4.3);
    }

    #[test]
    fn test_refresh_updates_item_fields() {
        let mut item = Item::new("Red".into(), "Acme".into(), String::new());
        item.posts.push(post(2.0));
        item.posts.push(post(3.0));

        let summary = refresh_item_rating(&mut item);
        assert_eq!(item.rating, 2.5);
        assert_eq!(item.review_count, 2);
        assert_eq!(summary.total_reviews, 2);
    }
}
