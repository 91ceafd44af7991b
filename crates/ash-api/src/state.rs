use std::sync::Arc;

use ash_core::services::{AccountService, AnalyticsService, ReviewService};
use ash_core::traits::AuthProvider;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub reviews: ReviewService,
    pub analytics: AnalyticsService,
    pub auth: Arc<dyn AuthProvider>,
}
