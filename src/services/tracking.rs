//! Booking form funnel tracking

use chrono::{Duration, Utc};

use crate::{
    error::{AppError, AppResult},
    models::tracking::{CreateTrackingEvent, PurgeResult, RequestContext, TrackingStats},
    repository::Repository,
};

pub const DEFAULT_STATS_DAYS: i64 = 30;
const MAX_STATS_DAYS: i64 = 365;
const TOP_ENTRY_PAGES: i64 = 10;
const RECENT_ABANDONED: i64 = 20;

#[derive(Clone)]
pub struct TrackingService {
    repository: Repository,
    retention_days: i64,
}

impl TrackingService {
    pub fn new(repository: Repository, retention_days: i64) -> Self {
        Self {
            repository,
            retention_days,
        }
    }

    pub async fn record(&self, input: &CreateTrackingEvent, ctx: RequestContext) -> AppResult<i64> {
        let event = input.normalize(ctx)?;
        let id = self.repository.tracking.insert(&event).await?;
        tracing::debug!(
            "Tracking event {:?} step {} for session {}",
            event.event_type,
            event.step_number,
            event.session_id
        );
        Ok(id)
    }

    pub async fn stats(&self, days: Option<i64>) -> AppResult<TrackingStats> {
        let days = stats_window(days);
        let since = Utc::now() - Duration::days(days);
        let tracking = &self.repository.tracking;

        let (funnel, abandonment_by_step, top_entry_pages, recent_abandoned_sessions, conversion) = tokio::try_join!(
            tracking.funnel(since),
            tracking.abandonment_by_step(since),
            tracking.top_entry_pages(since, TOP_ENTRY_PAGES),
            tracking.recent_abandoned_sessions(since, RECENT_ABANDONED),
            tracking.conversion(since),
        )?;

        Ok(TrackingStats {
            days,
            funnel,
            abandonment_by_step,
            top_entry_pages,
            recent_abandoned_sessions,
            conversion,
        })
    }

    /// Delete events older than `retention_days` (configured retention when `None`)
    pub async fn purge(&self, retention_days: Option<i64>) -> AppResult<PurgeResult> {
        let days = retention_days.unwrap_or(self.retention_days);
        if days < 1 {
            return Err(AppError::Validation("Retention must be at least one day".to_string()));
        }
        let cutoff = Utc::now() - Duration::days(days);
        let deleted = self.repository.tracking.purge_before(cutoff).await?;
        tracing::info!("Purged {} tracking events older than {} days", deleted, days);
        Ok(PurgeResult { deleted })
    }
}

fn stats_window(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_STATS_DAYS).clamp(1, MAX_STATS_DAYS)
}
