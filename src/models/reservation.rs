//! Reservation and passenger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{
    enums::{Currency, Gender, ReservationStatus},
    money::Money,
    parse_date, parse_optional_date, require, Pagination,
};
use crate::{error::AppResult, sanitize};

/// Reservation record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i32,
    /// Public booking code (RTT-YYYYMMDD-XXXX)
    pub code: String,
    pub tour_name: String,
    pub tour_date: NaiveDate,
    pub price_amount: Decimal,
    pub price_currency: Currency,
    pub representative_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub passenger_count: i32,
    pub status: ReservationStatus,
    /// Form language (es, en, ...)
    pub language: String,
    pub notes: Option<String>,
    pub email_sent_at: Option<DateTime<Utc>>,
    pub email_attempts: i32,
    pub email_last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn price(&self) -> Money {
        Money::new(self.price_amount, self.price_currency)
    }
}

/// Passenger record, always owned by a reservation
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Passenger {
    pub id: i32,
    pub reservation_id: i32,
    /// dni, passport, ce, other
    pub document_type: String,
    pub document_number: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub nationality: String,
    /// Allergies and other observations
    pub allergies: Option<String>,
}

/// Reservation with its passengers
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub passengers: Vec<Passenger>,
}

/// Passenger as submitted with a booking
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePassenger {
    #[validate(length(min = 1, max = 20))]
    pub document_type: String,
    #[validate(length(min = 1, max = 50))]
    pub document_number: String,
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    /// YYYY-MM-DD
    pub birth_date: Option<String>,
    pub gender: Gender,
    #[validate(length(min = 1, max = 100))]
    pub nationality: String,
    pub allergies: Option<String>,
}

/// Sanitized passenger ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewPassenger {
    pub document_type: String,
    pub document_number: String,
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Gender,
    pub nationality: String,
    pub allergies: Option<String>,
}

impl CreatePassenger {
    pub fn normalize(&self) -> AppResult<NewPassenger> {
        self.validate()?;
        Ok(NewPassenger {
            document_type: require(sanitize::text(&self.document_type).to_lowercase(), "document_type")?,
            document_number: require(sanitize::text(&self.document_number).to_uppercase(), "document_number")?,
            full_name: require(sanitize::text(&self.full_name), "full_name")?,
            birth_date: parse_optional_date(self.birth_date.as_deref(), "birth_date")?,
            gender: self.gender,
            nationality: require(sanitize::text(&self.nationality), "nationality")?,
            allergies: sanitize::optional_textarea(self.allergies.as_deref()),
        })
    }
}

/// Public booking form submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReservation {
    #[validate(length(min = 1, max = 255))]
    pub tour_name: String,
    /// YYYY-MM-DD
    pub tour_date: String,
    /// Free-text price as displayed on the form ("USD 150")
    pub price: String,
    #[validate(length(min = 1, max = 255))]
    pub representative_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub phone: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[validate(range(min = 1, max = 99))]
    pub passenger_count: i32,
    pub language: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub passengers: Vec<CreatePassenger>,
}

/// Sanitized reservation ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub tour_name: String,
    pub tour_date: NaiveDate,
    pub price: Money,
    pub representative_name: String,
    pub email: String,
    pub phone: String,
    pub country: String,
    pub passenger_count: i32,
    pub language: String,
    pub notes: Option<String>,
}

impl CreateReservation {
    /// Validate and sanitize the submission. Nothing touches storage if this fails.
    pub fn normalize(&self) -> AppResult<(NewReservation, Vec<NewPassenger>)> {
        self.validate()?;

        let reservation = NewReservation {
            tour_name: require(sanitize::text(&self.tour_name), "tour_name")?,
            tour_date: parse_date(&self.tour_date, "tour_date")?,
            price: Money::parse(&self.price, Currency::USD)?,
            representative_name: require(sanitize::text(&self.representative_name), "representative_name")?,
            email: require(sanitize::email(&self.email), "email")?,
            phone: require(sanitize::text(&self.phone), "phone")?,
            country: require(sanitize::text(&self.country), "country")?,
            passenger_count: self.passenger_count,
            language: normalize_language(self.language.as_deref()),
            notes: sanitize::optional_textarea(self.notes.as_deref()),
        };

        let passengers = self
            .passengers
            .iter()
            .map(CreatePassenger::normalize)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((reservation, passengers))
    }
}

fn normalize_language(lang: Option<&str>) -> String {
    lang.map(|l| sanitize::text(l).to_lowercase())
        .filter(|l| !l.is_empty())
        .map(|l| l.chars().take(5).collect())
        .unwrap_or_else(|| "es".to_string())
}

/// Columns the reservation list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReservationSortField {
    #[default]
    CreatedAt,
    TourDate,
    Code,
    Status,
}

impl ReservationSortField {
    /// Unknown names fall back to the default sort
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("tour_date") => ReservationSortField::TourDate,
            Some("code") => ReservationSortField::Code,
            Some("status") => ReservationSortField::Status,
            _ => ReservationSortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            ReservationSortField::CreatedAt => "created_at",
            ReservationSortField::TourDate => "tour_date",
            ReservationSortField::Code => "code",
            ReservationSortField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Query parameters for the reservation list
#[derive(Debug, Default, Deserialize)]
pub struct ReservationQuery {
    pub status: Option<String>,
    /// Matches code, representative name, email or tour name
    pub search: Option<String>,
    pub tour: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub date_from: Option<String>,
    /// YYYY-MM-DD, inclusive
    pub date_to: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Typed, validated reservation filter
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub status: Option<ReservationStatus>,
    pub search: Option<String>,
    pub tour: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub pagination: Pagination,
    pub sort: ReservationSortField,
    pub direction: SortDirection,
}

impl ReservationQuery {
    pub fn into_filter(self) -> AppResult<ReservationFilter> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<ReservationStatus>()?),
            None => None,
        };
        Ok(ReservationFilter {
            status,
            search: sanitize::optional(self.search.as_deref()),
            tour: sanitize::optional(self.tour.as_deref()),
            date_from: parse_optional_date(self.date_from.as_deref(), "date_from")?,
            date_to: parse_optional_date(self.date_to.as_deref(), "date_to")?,
            pagination: Pagination::new(self.page, self.per_page),
            sort: ReservationSortField::parse(self.sort.as_deref()),
            direction: SortDirection::parse(self.order.as_deref()),
        })
    }
}

/// Dashboard counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReservationStats {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    /// Reservations created in the current calendar month
    pub this_month: i64,
}

/// One calendar cell: every reservation on a tour date, summarized
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CalendarDay {
    pub tour_date: NaiveDate,
    pub total_reservations: i64,
    pub total_passengers: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub paid: i64,
    pub completed: i64,
    pub cancelled: i64,
    /// Distinct tour names joined with `|`
    pub tour_names: String,
}

/// Pending reservation whose tour date is close
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PendingAlert {
    pub id: i32,
    pub code: String,
    pub tour_name: String,
    pub tour_date: NaiveDate,
    pub representative_name: String,
    pub email: String,
    pub phone: String,
    pub passenger_count: i32,
    pub days_remaining: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNotesRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    /// YYYY-MM-DD
    pub from: String,
    /// YYYY-MM-DD
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    pub days_ahead: Option<i64>,
}
