//! Data models for the booking store

pub mod enums;
pub mod money;
pub mod provider;
pub mod quotation;
pub mod reservation;
pub mod tracking;
pub mod user;

use chrono::NaiveDate;
use rand::Rng;
use serde::Serialize;

use crate::error::{AppError, AppResult};

// Re-export commonly used types
pub use enums::{Currency, DiscountKind, Gender, ProviderType, QuotationStatus, ReservationStatus, TrackingEventType};
pub use money::Money;
pub use provider::Provider;
pub use quotation::{CostItem, Quotation};
pub use reservation::{Passenger, Reservation};

pub const RESERVATION_CODE_PREFIX: &str = "RTT";
pub const QUOTATION_CODE_PREFIX: &str = "COT";

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// `<PREFIX>-<YYYYMMDD>-<4 random uppercase alnum>`. Collisions are caught by
/// the unique key on the code column.
pub fn generate_code(prefix: &str, date: NaiveDate) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}-{}", prefix, date.format("%Y%m%d"), suffix)
}

/// Parse a `YYYY-MM-DD` date field
pub fn parse_date(value: &str, field: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid {} (expected YYYY-MM-DD)", field)))
}

pub fn parse_optional_date(value: Option<&str>, field: &str) -> AppResult<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(v, field).map(Some),
        None => Ok(None),
    }
}

/// Fails when a sanitized required field ended up empty
pub fn require(value: String, field: &str) -> AppResult<String> {
    if value.is_empty() {
        Err(AppError::Validation(format!("{} is required", field)))
    } else {
        Ok(value)
    }
}

/// Offset pagination, 1-based pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn page_count(&self, total: i64) -> i64 {
        (total + self.per_page - 1) / self.per_page
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub page_count: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        Self {
            items,
            total,
            page: pagination.page,
            per_page: pagination.per_page,
            page_count: pagination.page_count(total),
        }
    }
}

/// Escape `%`, `_` and `\` for use inside an ILIKE pattern.
pub fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
