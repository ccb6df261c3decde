//! Reservations service: validation, state rules and cached aggregates

use std::{sync::Arc, time::Duration};

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        generate_code,
        reservation::{
            CalendarDay, CreatePassenger, CreateReservation, PendingAlert, Reservation,
            ReservationDetails, ReservationFilter, ReservationStats,
        },
        PaginatedResponse, ReservationStatus, RESERVATION_CODE_PREFIX,
    },
    repository::{Repository, Tx},
    sanitize,
    services::{
        cache::{self, Cache, CacheKeys},
        email::EmailService,
    },
};

pub const DEFAULT_ALERT_DAYS: i64 = 7;
const MAX_ALERT_DAYS: i64 = 90;
const MAX_CALENDAR_DAYS: i64 = 366;

/// Cache lifetimes for the two reservation aggregates
#[derive(Debug, Clone, Copy)]
pub struct AggregateTtl {
    pub tours: Duration,
    pub stats: Duration,
}

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    cache: Arc<dyn Cache>,
    keys: CacheKeys,
    ttl: AggregateTtl,
    email: EmailService,
}

impl ReservationsService {
    pub fn new(
        repository: Repository,
        cache: Arc<dyn Cache>,
        keys: CacheKeys,
        ttl: AggregateTtl,
        email: EmailService,
    ) -> Self {
        Self {
            repository,
            cache,
            keys,
            ttl,
            email,
        }
    }

    /// Create a reservation with its passengers. Status is always `pendiente`.
    pub async fn create(&self, input: &CreateReservation) -> AppResult<ReservationDetails> {
        let (reservation, passengers) = input.normalize()?;
        let code = generate_code(RESERVATION_CODE_PREFIX, Utc::now().date_naive());

        let mut tx = self.repository.reservations.begin().await?;
        let (reservation, passengers) = self
            .repository
            .reservations
            .create(&mut tx, &code, &reservation, &passengers)
            .await?;
        self.commit(tx, &[self.keys.tours_list(), self.keys.reservation_stats()])
            .await?;

        tracing::info!(
            "Created reservation {} (id {}) with {} passengers",
            reservation.code,
            reservation.id,
            passengers.len()
        );

        Ok(ReservationDetails {
            reservation,
            passengers,
        })
    }

    pub async fn add_passengers(&self, id: i32, input: &[CreatePassenger]) -> AppResult<ReservationDetails> {
        if input.is_empty() {
            return Err(AppError::Validation("At least one passenger is required".to_string()));
        }
        let passengers = input
            .iter()
            .map(|p| p.normalize())
            .collect::<AppResult<Vec<_>>>()?;

        let added = self.repository.reservations.add_passengers(id, &passengers).await?;
        tracing::info!("Added {} passengers to reservation {}", added.len(), id);

        self.get(id).await
    }

    pub async fn get(&self, id: i32) -> AppResult<ReservationDetails> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        self.with_passengers(reservation).await
    }

    pub async fn get_by_code(&self, code: &str) -> AppResult<ReservationDetails> {
        let reservation = self.repository.reservations.get_by_code(code.trim()).await?;
        self.with_passengers(reservation).await
    }

    async fn with_passengers(&self, reservation: Reservation) -> AppResult<ReservationDetails> {
        let passengers = self.repository.reservations.passengers(reservation.id).await?;
        Ok(ReservationDetails {
            reservation,
            passengers,
        })
    }

    pub async fn list(&self, filter: &ReservationFilter) -> AppResult<PaginatedResponse<Reservation>> {
        let (items, total) = self.repository.reservations.list(filter).await?;
        Ok(PaginatedResponse::new(items, total, filter.pagination))
    }

    /// Admin status change. Unknown names are rejected before anything is read
    /// or written; leaving a terminal status is a business-rule violation.
    pub async fn update_status(&self, id: i32, status: &str) -> AppResult<Reservation> {
        let next: ReservationStatus = status.parse()?;

        let mut tx = self.repository.reservations.begin().await?;
        let updated = self
            .repository
            .reservations
            .update_status(&mut tx, id, next)
            .await?;
        self.commit(tx, &[self.keys.reservation_stats()]).await?;

        tracing::info!("Reservation {} status set to {}", updated.code, updated.status);
        Ok(updated)
    }

    /// Payment capture: the payment is authoritative over the admin workflow
    pub async fn mark_paid(&self, id: i32) -> AppResult<Reservation> {
        let mut tx = self.repository.reservations.begin().await?;
        let updated = self
            .repository
            .reservations
            .force_status(&mut tx, id, ReservationStatus::Paid)
            .await?;
        self.commit(tx, &[self.keys.reservation_stats()]).await?;

        tracing::info!("Reservation {} marked as paid", updated.code);
        Ok(updated)
    }

    pub async fn mark_paid_by_code(&self, code: &str) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_code(code).await?;
        self.mark_paid(reservation.id).await
    }

    pub async fn update_notes(&self, id: i32, notes: Option<&str>) -> AppResult<Reservation> {
        let notes = sanitize::optional_textarea(notes);
        self.repository
            .reservations
            .update_notes(id, notes.as_deref())
            .await
    }

    /// Delete passengers and reservation
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.repository.reservations.begin().await?;
        self.repository.reservations.delete(&mut tx, id).await?;
        self.commit(tx, &[self.keys.tours_list(), self.keys.reservation_stats()])
            .await?;
        tracing::info!("Deleted reservation {}", id);
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<ReservationStats> {
        let key = self.keys.reservation_stats();
        if let Some(stats) = cache::get_json(self.cache.as_ref(), &key).await {
            return Ok(stats);
        }
        let stats = self.repository.reservations.stats().await?;
        cache::set_json(self.cache.as_ref(), &key, &stats, self.ttl.stats).await;
        Ok(stats)
    }

    pub async fn tours(&self) -> AppResult<Vec<String>> {
        let key = self.keys.tours_list();
        if let Some(tours) = cache::get_json(self.cache.as_ref(), &key).await {
            return Ok(tours);
        }
        let tours = self.repository.reservations.tour_names().await?;
        cache::set_json(self.cache.as_ref(), &key, &tours, self.ttl.tours).await;
        Ok(tours)
    }

    pub async fn calendar(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<CalendarDay>> {
        validate_range(from, to)?;
        self.repository.reservations.calendar(from, to).await
    }

    pub async fn day(&self, date: NaiveDate) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.by_tour_date(date).await
    }

    pub async fn pending_alerts(&self, days_ahead: Option<i64>) -> AppResult<Vec<PendingAlert>> {
        let days = alert_window(days_ahead);
        let today = Utc::now().date_naive();
        let until = today + ChronoDuration::days(days);
        self.repository.reservations.pending_alerts(today, until).await
    }

    /// Email the confirmation and record the attempt on the reservation
    pub async fn send_confirmation(&self, id: i32) -> AppResult<()> {
        if !self.email.is_enabled() {
            tracing::info!("Email disabled, confirmation for reservation {} not sent", id);
            return Ok(());
        }

        let details = self.get(id).await?;
        let result = self.email.send_booking_confirmation(&details).await;

        let error = result.as_ref().err().map(|e| e.to_string());
        self.repository
            .reservations
            .record_email_result(id, error.as_deref())
            .await?;

        match &result {
            Ok(()) => tracing::info!("Confirmation sent for {}", details.reservation.code),
            Err(e) => tracing::warn!("Confirmation for {} failed: {}", details.reservation.code, e),
        }
        result
    }

    /// Drop `keys` and commit. A cache failure before the commit rolls the
    /// write back; the pass after the commit only logs.
    async fn commit(&self, tx: Tx, keys: &[String]) -> AppResult<()> {
        for key in keys {
            self.cache.delete(key).await?;
        }
        tx.commit().await?;

        for key in keys {
            if let Err(e) = self.cache.delete(key).await {
                tracing::warn!("Cache eviction of {} after commit failed: {}", key, e);
            }
        }
        Ok(())
    }
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> AppResult<()> {
    if from > to {
        return Err(AppError::Validation("`from` must not be after `to`".to_string()));
    }
    if (to - from).num_days() > MAX_CALENDAR_DAYS {
        return Err(AppError::Validation(format!(
            "Calendar range is limited to {} days",
            MAX_CALENDAR_DAYS
        )));
    }
    Ok(())
}

fn alert_window(days_ahead: Option<i64>) -> i64 {
    days_ahead.unwrap_or(DEFAULT_ALERT_DAYS).clamp(0, MAX_ALERT_DAYS)
}
