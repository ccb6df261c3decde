//! Quotations repository

use sqlx::{types::Json, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::QuotationStatus,
        like_pattern,
        quotation::{NewQuotation, Quotation, QuotationFilter, SellerStats},
    },
};

/// Open quotation past its validity window (or one stored as expired)
const EXPIRED_SQL: &str = "(status = 'vencida' OR (status IN ('borrador', 'enviada') \
     AND COALESCE(sent_at, created_at) + make_interval(days => validity_days) < NOW()))";

#[derive(Clone)]
pub struct QuotationsRepository {
    pool: Pool<Postgres>,
}

impl QuotationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, code: &str, seller_id: i32, data: &NewQuotation) -> AppResult<Quotation> {
        let row = sqlx::query_as::<_, Quotation>(
            r#"
            INSERT INTO quotations (
                code, seller_id, client_name, client_email, client_phone, client_country,
                tour_name, tour_date, passenger_count, unit_price, total_price,
                discount_value, discount_kind, currency, validity_days,
                notes, terms, payment_instructions, costs, margin_notes, status
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(seller_id)
        .bind(&data.client_name)
        .bind(&data.client_email)
        .bind(&data.client_phone)
        .bind(&data.client_country)
        .bind(&data.tour_name)
        .bind(data.tour_date)
        .bind(data.passenger_count)
        .bind(data.unit_price)
        .bind(data.total_price)
        .bind(data.discount_value)
        .bind(data.discount_kind)
        .bind(data.currency)
        .bind(data.validity_days)
        .bind(&data.notes)
        .bind(&data.terms)
        .bind(&data.payment_instructions)
        .bind(Json(&data.costs))
        .bind(&data.margin_notes)
        .bind(QuotationStatus::Draft)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Get quotation by ID; `seller` restricts the lookup to one seller's rows
    pub async fn get_by_id(&self, id: i32, seller: Option<i32>) -> AppResult<Quotation> {
        sqlx::query_as::<_, Quotation>(
            "SELECT * FROM quotations WHERE id = $1 AND ($2::int IS NULL OR seller_id = $2)",
        )
        .bind(id)
        .bind(seller)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quotation {} not found", id)))
    }

    pub async fn get_by_code(&self, code: &str) -> AppResult<Quotation> {
        sqlx::query_as::<_, Quotation>("SELECT * FROM quotations WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quotation {} not found", code)))
    }

    pub async fn list(&self, filter: &QuotationFilter) -> AppResult<(Vec<Quotation>, i64)> {
        let mut count_q = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quotations WHERE TRUE");
        push_filters(&mut count_q, filter);
        let total: i64 = count_q.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select_q = QueryBuilder::<Postgres>::new("SELECT * FROM quotations WHERE TRUE");
        push_filters(&mut select_q, filter);
        select_q
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.pagination.per_page)
            .push(" OFFSET ")
            .push_bind(filter.pagination.offset());

        let rows = select_q
            .build_query_as::<Quotation>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    /// Rewrite every editable column; code, seller and lifecycle stamps are untouched
    pub async fn update(&self, id: i32, data: &NewQuotation) -> AppResult<Quotation> {
        sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations SET
                client_name = $1, client_email = $2, client_phone = $3, client_country = $4,
                tour_name = $5, tour_date = $6, passenger_count = $7, unit_price = $8,
                total_price = $9, discount_value = $10, discount_kind = $11, currency = $12,
                validity_days = $13, notes = $14, terms = $15, payment_instructions = $16,
                costs = $17, margin_notes = $18, updated_at = NOW()
            WHERE id = $19
            RETURNING *
            "#,
        )
        .bind(&data.client_name)
        .bind(&data.client_email)
        .bind(&data.client_phone)
        .bind(&data.client_country)
        .bind(&data.tour_name)
        .bind(data.tour_date)
        .bind(data.passenger_count)
        .bind(data.unit_price)
        .bind(data.total_price)
        .bind(data.discount_value)
        .bind(data.discount_kind)
        .bind(data.currency)
        .bind(data.validity_days)
        .bind(&data.notes)
        .bind(&data.terms)
        .bind(&data.payment_instructions)
        .bind(Json(&data.costs))
        .bind(&data.margin_notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quotation {} not found", id)))
    }

    /// Status `enviada`; re-sending restarts the validity window
    pub async fn mark_sent(&self, id: i32) -> AppResult<Quotation> {
        sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations SET status = $1, sent_at = NOW(), updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(QuotationStatus::Sent)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quotation {} not found", id)))
    }

    pub async fn mark_accepted(&self, id: i32) -> AppResult<Quotation> {
        sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations SET
                status = $1, accepted_at = COALESCE(accepted_at, NOW()), updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(QuotationStatus::Accepted)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quotation {} not found", id)))
    }

    pub async fn link_reservation(&self, id: i32, reservation_id: i32) -> AppResult<Quotation> {
        sqlx::query_as::<_, Quotation>(
            "UPDATE quotations SET reservation_id = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(reservation_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quotation {} not found", id)))
    }

    pub async fn delete(&self, id: i32, seller: Option<i32>) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM quotations WHERE id = $1 AND ($2::int IS NULL OR seller_id = $2)",
        )
        .bind(id)
        .bind(seller)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Quotation {} not found", id)));
        }
        Ok(())
    }

    /// Counters by effective status; `seller = None` aggregates every seller
    pub async fn seller_stats(&self, seller: Option<i32>) -> AppResult<SellerStats> {
        let query = format!(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'borrador' AND NOT {expired}) AS draft,
                COUNT(*) FILTER (WHERE status = 'enviada' AND NOT {expired}) AS sent,
                COUNT(*) FILTER (WHERE status = 'aceptada') AS accepted,
                COUNT(*) FILTER (WHERE {expired}) AS expired,
                COALESCE(SUM(total_price) FILTER (WHERE status = 'aceptada'), 0) AS accepted_total
            FROM quotations
            WHERE ($1::int IS NULL OR seller_id = $1)
            "#,
            expired = EXPIRED_SQL
        );
        let stats = sqlx::query_as::<_, SellerStats>(&query)
            .bind(seller)
            .fetch_one(&self.pool)
            .await?;
        Ok(stats)
    }
}

fn push_filters(q: &mut QueryBuilder<'_, Postgres>, filter: &QuotationFilter) {
    if let Some(seller) = filter.seller_id {
        q.push(" AND seller_id = ").push_bind(seller);
    }
    match filter.status {
        Some(QuotationStatus::Expired) => {
            q.push(" AND ").push(EXPIRED_SQL);
        }
        Some(QuotationStatus::Accepted) => {
            q.push(" AND status = ").push_bind(QuotationStatus::Accepted);
        }
        Some(open) => {
            q.push(" AND status = ")
                .push_bind(open)
                .push(" AND NOT ")
                .push(EXPIRED_SQL);
        }
        None => {}
    }
    if let Some(ref search) = filter.search {
        let pattern = like_pattern(search);
        q.push(" AND (code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR client_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR client_email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR tour_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
