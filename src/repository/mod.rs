//! Repository layer for database operations

pub mod providers;
pub mod quotations;
pub mod reservations;
pub mod tracking;

use sqlx::{Pool, Postgres, Transaction};

/// Open write transaction handed between the repository and its callers
pub type Tx = Transaction<'static, Postgres>;

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub reservations: reservations::ReservationsRepository,
    pub quotations: quotations::QuotationsRepository,
    pub providers: providers::ProvidersRepository,
    pub tracking: tracking::TrackingRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            quotations: quotations::QuotationsRepository::new(pool.clone()),
            providers: providers::ProvidersRepository::new(pool.clone()),
            tracking: tracking::TrackingRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connectivity check for the readiness endpoint
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
