//! Form tracking repository (append-only)

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::AppResult,
    models::tracking::{AbandonedSession, Conversion, EntryPage, NewTrackingEvent, StepCount},
};

#[derive(Clone)]
pub struct TrackingRepository {
    pool: Pool<Postgres>,
}

impl TrackingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &NewTrackingEvent) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tracking_events (
                session_id, client_ip, page_url, page_title, step_number, event_type,
                tour_name, tour_date, passenger_count, user_agent, referrer, language
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&event.session_id)
        .bind(&event.client_ip)
        .bind(&event.page_url)
        .bind(&event.page_title)
        .bind(event.step_number)
        .bind(event.event_type)
        .bind(&event.tour_name)
        .bind(event.tour_date)
        .bind(event.passenger_count)
        .bind(&event.user_agent)
        .bind(&event.referrer)
        .bind(&event.language)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Distinct sessions that reached each step
    pub async fn funnel(&self, since: DateTime<Utc>) -> AppResult<Vec<StepCount>> {
        let rows = sqlx::query_as::<_, StepCount>(
            r#"
            SELECT step_number, COUNT(DISTINCT session_id) AS sessions
            FROM tracking_events
            WHERE created_at >= $1 AND step_number > 0
            GROUP BY step_number
            ORDER BY step_number
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Sessions without a submit, grouped by the furthest step they reached.
    /// Sessions that never got past the first step are counted under step 1.
    pub async fn abandonment_by_step(&self, since: DateTime<Utc>) -> AppResult<Vec<StepCount>> {
        let rows = sqlx::query_as::<_, StepCount>(
            r#"
            SELECT s.last_step AS step_number, COUNT(*) AS sessions
            FROM (
                SELECT session_id, GREATEST(MAX(step_number), 1) AS last_step
                FROM tracking_events
                WHERE created_at >= $1
                GROUP BY session_id
                HAVING COUNT(*) FILTER (WHERE event_type = 'form_submit') = 0
            ) s
            GROUP BY s.last_step
            ORDER BY s.last_step
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Page of each session's first event, most common first
    pub async fn top_entry_pages(&self, since: DateTime<Utc>, limit: i64) -> AppResult<Vec<EntryPage>> {
        let rows = sqlx::query_as::<_, EntryPage>(
            r#"
            SELECT e.page_url, COUNT(*) AS sessions
            FROM (
                SELECT DISTINCT ON (session_id) session_id, page_url
                FROM tracking_events
                WHERE created_at >= $1
                ORDER BY session_id, created_at ASC, id ASC
            ) e
            GROUP BY e.page_url
            ORDER BY sessions DESC, e.page_url
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent_abandoned_sessions(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<AbandonedSession>> {
        let rows = sqlx::query_as::<_, AbandonedSession>(
            r#"
            SELECT
                session_id,
                GREATEST(MAX(step_number), 1) AS last_step,
                (ARRAY_AGG(tour_name ORDER BY created_at DESC) FILTER (WHERE tour_name IS NOT NULL))[1] AS tour_name,
                (ARRAY_AGG(language ORDER BY created_at DESC) FILTER (WHERE language IS NOT NULL))[1] AS language,
                MAX(created_at) AS last_event_at
            FROM tracking_events
            WHERE created_at >= $1
            GROUP BY session_id
            HAVING COUNT(*) FILTER (WHERE event_type = 'form_submit') = 0
            ORDER BY last_event_at DESC
            LIMIT $2
            "#,
        )
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn conversion(&self, since: DateTime<Utc>) -> AppResult<Conversion> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(DISTINCT session_id) FILTER (WHERE event_type = 'form_open') AS opens,
                COUNT(DISTINCT session_id) FILTER (WHERE event_type = 'form_submit') AS submits
            FROM tracking_events
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(Conversion::new(row.get("opens"), row.get("submits")))
    }

    /// Bulk delete of events older than `before`
    pub async fn purge_before(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM tracking_events WHERE created_at < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
