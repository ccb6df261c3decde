//! Providers repository

use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        like_pattern,
        provider::{NewProvider, Provider, ProviderQuery},
    },
};

#[derive(Clone)]
pub struct ProvidersRepository {
    pool: Pool<Postgres>,
}

impl ProvidersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: &NewProvider) -> AppResult<Provider> {
        let row = sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (
                provider_type, name, contact_name, phone, email,
                base_cost, currency, active, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(data.provider_type)
        .bind(&data.name)
        .bind(&data.contact_name)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(data.base_cost)
        .bind(data.currency)
        .bind(data.active)
        .bind(&data.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Provider> {
        sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Provider {} not found", id)))
    }

    pub async fn list(&self, query: &ProviderQuery) -> AppResult<Vec<Provider>> {
        let mut q = QueryBuilder::<Postgres>::new("SELECT * FROM providers WHERE TRUE");
        if let Some(provider_type) = query.provider_type {
            q.push(" AND provider_type = ").push_bind(provider_type);
        }
        if let Some(active) = query.active {
            q.push(" AND active = ").push_bind(active);
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            q.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR contact_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        q.push(" ORDER BY provider_type, name");

        let rows = q.build_query_as::<Provider>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn update(&self, id: i32, data: &NewProvider) -> AppResult<Provider> {
        sqlx::query_as::<_, Provider>(
            r#"
            UPDATE providers SET
                provider_type = $1, name = $2, contact_name = $3, phone = $4, email = $5,
                base_cost = $6, currency = $7, active = $8, notes = $9, updated_at = NOW()
            WHERE id = $10
            RETURNING *
            "#,
        )
        .bind(data.provider_type)
        .bind(&data.name)
        .bind(&data.contact_name)
        .bind(&data.phone)
        .bind(&data.email)
        .bind(data.base_cost)
        .bind(data.currency)
        .bind(data.active)
        .bind(&data.notes)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Provider {} not found", id)))
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM providers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Provider {} not found", id)));
        }
        Ok(())
    }
}
