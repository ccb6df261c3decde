//! Reservations repository for database operations

use chrono::NaiveDate;
use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use super::Tx;
use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ReservationStatus,
        like_pattern,
        reservation::{
            CalendarDay, NewPassenger, NewReservation, Passenger, PendingAlert, Reservation,
            ReservationFilter, ReservationStats,
        },
    },
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> AppResult<Tx> {
        Ok(self.pool.begin().await?)
    }

    /// Insert a reservation and its passengers inside `tx`. Status is always `pendiente`.
    pub async fn create(
        &self,
        tx: &mut Tx,
        code: &str,
        data: &NewReservation,
        passengers: &[NewPassenger],
    ) -> AppResult<(Reservation, Vec<Passenger>)> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (
                code, tour_name, tour_date, price_amount, price_currency,
                representative_name, email, phone, country, passenger_count,
                status, language, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(&data.tour_name)
        .bind(data.tour_date)
        .bind(data.price.amount)
        .bind(data.price.currency)
        .bind(&data.representative_name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.country)
        .bind(data.passenger_count)
        .bind(ReservationStatus::Pending)
        .bind(&data.language)
        .bind(&data.notes)
        .fetch_one(&mut **tx)
        .await?;

        let passengers = insert_passengers(tx, reservation.id, passengers).await?;
        Ok((reservation, passengers))
    }

    /// Add passengers to an existing reservation, all or nothing
    pub async fn add_passengers(
        &self,
        reservation_id: i32,
        passengers: &[NewPassenger],
    ) -> AppResult<Vec<Passenger>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i32> =
            sqlx::query_scalar("SELECT id FROM reservations WHERE id = $1 FOR UPDATE")
                .bind(reservation_id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Reservation {} not found",
                reservation_id
            )));
        }

        let rows = insert_passengers(&mut tx, reservation_id, passengers).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Get reservation by booking code
    pub async fn get_by_code(&self, code: &str) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", code)))
    }

    pub async fn passengers(&self, reservation_id: i32) -> AppResult<Vec<Passenger>> {
        let rows = sqlx::query_as::<_, Passenger>(
            "SELECT * FROM passengers WHERE reservation_id = $1 ORDER BY id",
        )
        .bind(reservation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// List reservations with filters, sorting and pagination
    pub async fn list(&self, filter: &ReservationFilter) -> AppResult<(Vec<Reservation>, i64)> {
        let mut count_q = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM reservations WHERE TRUE");
        push_filters(&mut count_q, filter);
        let total: i64 = count_q.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select_q = QueryBuilder::<Postgres>::new("SELECT * FROM reservations WHERE TRUE");
        push_filters(&mut select_q, filter);
        // Column and direction come from closed enums, never from user text
        select_q.push(format!(
            " ORDER BY {col} {dir}, id {dir}",
            col = filter.sort.column(),
            dir = filter.direction.sql()
        ));
        select_q
            .push(" LIMIT ")
            .push_bind(filter.pagination.per_page)
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let rows = select_q
            .build_query_as::<Reservation>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    /// Admin status change. The row is only written when its current status
    /// may move to `status`; the check is part of the UPDATE.
    pub async fn update_status(&self, tx: &mut Tx, id: i32, status: ReservationStatus) -> AppResult<Reservation> {
        let allowed_from: Vec<&str> = ReservationStatus::ALL
            .iter()
            .filter(|from| from.can_transition_to(status))
            .map(|from| from.as_str())
            .collect();

        let updated = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status::text = ANY($3)
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(id)
        .bind(&allowed_from)
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(reservation) = updated {
            return Ok(reservation);
        }

        let current = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))?;
        Err(AppError::BusinessRule(format!(
            "Reservation {} is {} and cannot change to {}",
            current.code, current.status, status
        )))
    }

    /// Unconditional status write, used by payment capture
    pub async fn force_status(&self, tx: &mut Tx, id: i32, status: ReservationStatus) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    pub async fn update_notes(&self, id: i32, notes: Option<&str>) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET notes = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation {} not found", id)))
    }

    /// Count a delivery attempt; `error` is `None` when the mail went out.
    pub async fn record_email_result(&self, id: i32, error: Option<&str>) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations SET
                email_attempts = email_attempts + 1,
                email_sent_at = CASE WHEN $2::text IS NULL THEN NOW() ELSE email_sent_at END,
                email_last_error = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(())
    }

    /// Delete a reservation and its passengers inside `tx`
    pub async fn delete(&self, tx: &mut Tx, id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM passengers WHERE reservation_id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Reservation {} not found", id)));
        }
        Ok(())
    }

    /// Dashboard counters in a single pass
    pub async fn stats(&self) -> AppResult<ReservationStats> {
        let stats = sqlx::query_as::<_, ReservationStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'pendiente') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmada') AS confirmed,
                COUNT(*) FILTER (WHERE created_at >= date_trunc('month', NOW())) AS this_month
            FROM reservations
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    /// Distinct tour names, alphabetical
    pub async fn tour_names(&self) -> AppResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT tour_name FROM reservations ORDER BY tour_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// One summary row per tour date in `[from, to]`
    pub async fn calendar(&self, from: NaiveDate, to: NaiveDate) -> AppResult<Vec<CalendarDay>> {
        let rows = sqlx::query_as::<_, CalendarDay>(
            r#"
            SELECT
                tour_date,
                COUNT(*) AS total_reservations,
                COALESCE(SUM(passenger_count), 0)::bigint AS total_passengers,
                COUNT(*) FILTER (WHERE status = 'pendiente') AS pending,
                COUNT(*) FILTER (WHERE status = 'confirmada') AS confirmed,
                COUNT(*) FILTER (WHERE status = 'pagada') AS paid,
                COUNT(*) FILTER (WHERE status = 'completada') AS completed,
                COUNT(*) FILTER (WHERE status = 'cancelada') AS cancelled,
                STRING_AGG(DISTINCT tour_name, '|' ORDER BY tour_name) AS tour_names
            FROM reservations
            WHERE tour_date >= $1 AND tour_date <= $2
            GROUP BY tour_date
            ORDER BY tour_date
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Reservations for one tour date (calendar day detail)
    pub async fn by_tour_date(&self, date: NaiveDate) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE tour_date = $1 ORDER BY tour_name, created_at",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Pending reservations with a tour date in `[today, until]`, soonest first
    pub async fn pending_alerts(&self, today: NaiveDate, until: NaiveDate) -> AppResult<Vec<PendingAlert>> {
        let rows = sqlx::query_as::<_, PendingAlert>(
            r#"
            SELECT
                id, code, tour_name, tour_date, representative_name, email, phone,
                passenger_count, (tour_date - $1::date) AS days_remaining
            FROM reservations
            WHERE status = 'pendiente' AND tour_date >= $1 AND tour_date <= $2
            ORDER BY tour_date ASC, created_at ASC
            "#,
        )
        .bind(today)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn push_filters(q: &mut QueryBuilder<'_, Postgres>, filter: &ReservationFilter) {
    if let Some(status) = filter.status {
        q.push(" AND status = ").push_bind(status);
    }
    if let Some(ref search) = filter.search {
        let pattern = like_pattern(search);
        q.push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR representative_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR tour_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(ref tour) = filter.tour {
        q.push(" AND tour_name = ").push_bind(tour.clone());
    }
    if let Some(from) = filter.date_from {
        q.push(" AND tour_date >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        q.push(" AND tour_date <= ").push_bind(to);
    }
}

async fn insert_passengers(
    tx: &mut Transaction<'_, Postgres>,
    reservation_id: i32,
    passengers: &[NewPassenger],
) -> AppResult<Vec<Passenger>> {
    let mut rows = Vec::with_capacity(passengers.len());
    for p in passengers {
        let row = sqlx::query_as::<_, Passenger>(
            r#"
            INSERT INTO passengers (
                reservation_id, document_type, document_number, full_name,
                birth_date, gender, nationality, allergies
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(reservation_id)
        .bind(&p.document_type)
        .bind(&p.document_number)
        .bind(&p.full_name)
        .bind(p.birth_date)
        .bind(p.gender)
        .bind(&p.nationality)
        .bind(&p.allergies)
        .fetch_one(&mut **tx)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}
