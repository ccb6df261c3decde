//! Booking form funnel tracking

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{enums::TrackingEventType, parse_optional_date, require};
use crate::{error::AppResult, sanitize};

/// Event as posted by the booking form script
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTrackingEvent {
    #[validate(length(min = 1, max = 64))]
    pub session_id: String,
    pub event_type: TrackingEventType,
    #[validate(range(min = 0, max = 20))]
    pub step_number: Option<i32>,
    pub page_url: Option<String>,
    pub page_title: Option<String>,
    pub tour_name: Option<String>,
    /// YYYY-MM-DD
    pub tour_date: Option<String>,
    #[validate(range(min = 0, max = 99))]
    pub passenger_count: Option<i32>,
    pub referrer: Option<String>,
    pub language: Option<String>,
}

/// Connection details taken from the HTTP request, not the payload
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTrackingEvent {
    pub session_id: String,
    pub client_ip: Option<String>,
    pub page_url: Option<String>,
    pub page_title: Option<String>,
    pub step_number: i32,
    pub event_type: TrackingEventType,
    pub tour_name: Option<String>,
    pub tour_date: Option<NaiveDate>,
    pub passenger_count: Option<i32>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub language: Option<String>,
}

impl CreateTrackingEvent {
    pub fn normalize(&self, ctx: RequestContext) -> AppResult<NewTrackingEvent> {
        self.validate()?;
        Ok(NewTrackingEvent {
            session_id: require(sanitize::text(&self.session_id), "session_id")?,
            client_ip: ctx.client_ip,
            page_url: sanitize::optional(self.page_url.as_deref()),
            page_title: sanitize::optional(self.page_title.as_deref()).map(|t| truncate(&t, 255)),
            step_number: self.step_number.unwrap_or(0),
            event_type: self.event_type,
            tour_name: sanitize::optional(self.tour_name.as_deref()).map(|t| truncate(&t, 255)),
            // Form scripts send partial dates while the user types; those are dropped
            tour_date: parse_optional_date(self.tour_date.as_deref(), "tour_date").unwrap_or(None),
            passenger_count: self.passenger_count,
            user_agent: sanitize::optional(ctx.user_agent.as_deref()),
            referrer: sanitize::optional(self.referrer.as_deref()),
            language: sanitize::optional(self.language.as_deref())
                .map(|l| l.to_lowercase().chars().take(5).collect()),
        })
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct StepCount {
    pub step_number: i32,
    pub sessions: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EntryPage {
    pub page_url: Option<String>,
    pub sessions: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AbandonedSession {
    pub session_id: String,
    pub last_step: i32,
    pub tour_name: Option<String>,
    pub language: Option<String>,
    pub last_event_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    /// Distinct sessions that opened the form
    pub opens: i64,
    /// Distinct sessions that submitted it
    pub submits: i64,
    /// Percentage, one decimal
    pub rate: f64,
}

impl Conversion {
    pub fn new(opens: i64, submits: i64) -> Self {
        Self {
            opens,
            submits,
            rate: conversion_rate(opens, submits),
        }
    }
}

pub fn conversion_rate(opens: i64, submits: i64) -> f64 {
    if opens <= 0 {
        return 0.0;
    }
    let rate = submits as f64 / opens as f64 * 100.0;
    (rate * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingStats {
    pub days: i64,
    pub funnel: Vec<StepCount>,
    pub abandonment_by_step: Vec<StepCount>,
    pub top_entry_pages: Vec<EntryPage>,
    pub recent_abandoned_sessions: Vec<AbandonedSession>,
    pub conversion: Conversion,
}

#[derive(Debug, Deserialize)]
pub struct TrackingStatsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResult {
    pub deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_rate_rounds_to_one_decimal() {
        assert_eq!(conversion_rate(10, 3), 30.0);
        assert_eq!(conversion_rate(3, 1), 33.3);
        assert_eq!(conversion_rate(3, 2), 66.7);
    }

    #[test]
    fn conversion_rate_is_zero_without_opens() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(0, 4), 0.0);
    }

    #[test]
    fn normalizes_event_with_request_context() {
        let event = CreateTrackingEvent {
            session_id: "sess-1".to_string(),
            event_type: TrackingEventType::StepView,
            step_number: Some(2),
            page_url: Some("https://example.com/tours/inca".to_string()),
            page_title: None,
            tour_name: Some("Inca Trail".to_string()),
            tour_date: Some("2024-0".to_string()),
            passenger_count: Some(3),
            referrer: None,
            language: Some("EN-us".to_string()),
        };
        let ctx = RequestContext {
            client_ip: Some("203.0.113.9".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
        };
        let n = event.normalize(ctx).unwrap();
        assert_eq!(n.step_number, 2);
        assert_eq!(n.tour_date, None);
        assert_eq!(n.language.as_deref(), Some("en-us"));
        assert_eq!(n.client_ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn session_id_that_sanitizes_to_nothing_is_rejected() {
        let event: CreateTrackingEvent = serde_json::from_value(serde_json::json!({
            "session_id": "<b></b>",
            "event_type": "form_open",
        }))
        .unwrap();
        let err = event.normalize(RequestContext::default()).unwrap_err();
        assert!(matches!(err, crate::error::AppError::Validation(_)));
    }
}
