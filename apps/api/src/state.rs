use std::sync::Arc;

use crate::cache::AnalyticsCache;
use crate::config::Config;
use crate::notify::Notifier;
use crate::referrals::store::ReferralStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable data access. Default: PgReferralStore.
    pub store: Arc<dyn ReferralStore>,
    /// Present only when REDIS_URL is configured.
    pub cache: Option<AnalyticsCache>,
    pub notifier: Notifier,
    pub config: Config,
}
