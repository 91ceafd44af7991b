//! Basic marketing analytics: named events, counted over a time window.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{AnalyticsEvent, EventCount};
use crate::traits::AnalyticsRepo;

const MAX_EVENT_NAME_CHARS: usize = 64;
const MAX_SUMMARY_HOURS: i64 = 24 * 365;

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn AnalyticsRepo>,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn AnalyticsRepo>) -> Self {
        Self { repo }
    }

    pub async fn record(&self, name: &str, item_id: Option<Uuid>, user_id: Option<Uuid>) -> Result<AnalyticsEvent> {
        if !is_valid_event_name(name) {
            return Err(AppError::validation(
                "event name must be 1-64 characters of a-z, 0-9 or _",
            ));
        }
        let event = AnalyticsEvent {
            id: Uuid::now_v7(),
            name: name.to_string(),
            item_id,
            user_id,
            occurred_at: Utc::now(),
        };
        self.repo.record_event(event.clone()).await?;
        tracing::debug!(event = %event.name, ?item_id, "analytics event recorded");
        Ok(event)
    }

    pub async fn summary(&self, since_hours: i64) -> Result<Vec<EventCount>> {
        if !(1..=MAX_SUMMARY_HOURS).contains(&since_hours) {
            return Err(AppError::validation(format!(
                "since_hours must be between 1 and {MAX_SUMMARY_HOURS}"
            )));
        }
        let since = Utc::now() - Duration::hours(since_hours);
        Ok(self.repo.summarize(since).await?)
    }
}

fn is_valid_event_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_EVENT_NAME_CHARS
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockAnalyticsRepo;

    #[test]
    fn test_event_names() {
        assert!(is_valid_event_name("item_view"));
        assert!(is_valid_event_name("cta_2"));
        assert!(!is_valid_event_name(""));
        assert!(!is_valid_event_name("Item View"));
        assert!(!is_valid_event_name(&"a".repeat(65)));
    }

    #[tokio::test]
    async fn test_record_and_summary_validation() {
        let mut repo = MockAnalyticsRepo::new();
        repo.expect_record_event()
            .withf(|e| e.name == "item_view")
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_summarize().times(1).returning(|_| {
            Ok(vec![EventCount {
                name: "item_view".into(),
                count: 3,
            }])
        });
        let svc = AnalyticsService::new(Arc::new(repo));

        svc.record("item_view", None, None).await.unwrap();
        assert!(svc.record("DROP TABLE", None, None).await.is_err());

        assert!(svc.summary(0).await.is_err());
        let counts = svc.summary(24).await.unwrap();
        assert_eq!(counts[0].count, 3);
    }
}
