//! Quotation (seller price proposal) models

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use validator::Validate;

use super::{
    enums::{Currency, DiscountKind, QuotationStatus},
    money::check_amount,
    parse_optional_date, require, Pagination,
};
use crate::{
    error::{AppError, AppResult},
    sanitize,
};

pub const DEFAULT_VALIDITY_DAYS: i32 = 15;

/// One line of the internal cost breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    pub concept: String,
    pub amount: Decimal,
}

/// Quotation record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quotation {
    pub id: i32,
    /// COT-YYYYMMDD-XXXX
    pub code: String,
    pub seller_id: i32,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_country: Option<String>,
    pub tour_name: String,
    pub tour_date: Option<NaiveDate>,
    pub passenger_count: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub discount_value: Decimal,
    pub discount_kind: DiscountKind,
    pub currency: Currency,
    pub validity_days: i32,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_instructions: Option<String>,
    pub costs: Json<Vec<CostItem>>,
    pub margin_notes: Option<String>,
    pub reservation_id: Option<i32>,
    pub status: QuotationStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    pub fn cost_total(&self) -> Decimal {
        cost_total(&self.costs)
    }

    pub fn margin(&self) -> Decimal {
        self.total_price - self.cost_total()
    }

    /// End of the validity window, counted from sending (or creation for drafts)
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.sent_at.unwrap_or(self.created_at) + Duration::days(i64::from(self.validity_days))
    }

    /// Stored status, except open quotations past their window read as `vencida`
    pub fn effective_status(&self, now: DateTime<Utc>) -> QuotationStatus {
        if self.status.is_open() && now > self.expires_at() {
            QuotationStatus::Expired
        } else {
            self.status
        }
    }

    pub fn into_view(self, now: DateTime<Utc>) -> QuotationView {
        QuotationView {
            effective_status: self.effective_status(now),
            cost_total: self.cost_total(),
            margin: self.margin(),
            expires_at: self.expires_at(),
            quotation: self,
        }
    }
}

/// Quotation plus derived values
#[derive(Debug, Clone, Serialize)]
pub struct QuotationView {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub effective_status: QuotationStatus,
    pub cost_total: Decimal,
    pub margin: Decimal,
    pub expires_at: DateTime<Utc>,
}

pub fn cost_total(costs: &[CostItem]) -> Decimal {
    costs.iter().map(|c| c.amount).sum()
}

/// unit price x passengers, minus the discount, never below zero
pub fn compute_total(
    unit_price: Decimal,
    passenger_count: i32,
    discount_value: Decimal,
    discount_kind: DiscountKind,
) -> AppResult<Decimal> {
    let unit_price = check_amount(unit_price, "unit_price")?;
    let discount_value = check_amount(discount_value, "discount_value")?;
    let too_large = || AppError::Validation("Quotation total is out of range".to_string());

    let subtotal = unit_price
        .checked_mul(Decimal::from(passenger_count))
        .ok_or_else(too_large)?;
    let discount = match discount_kind {
        DiscountKind::Amount => discount_value,
        DiscountKind::Percentage => {
            if discount_value > Decimal::ONE_HUNDRED {
                return Err(AppError::Validation(
                    "Percentage discount cannot exceed 100".to_string(),
                ));
            }
            subtotal
                .checked_mul(discount_value)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .ok_or_else(too_large)?
        }
    };

    let total = subtotal.checked_sub(discount).ok_or_else(too_large)?;
    check_amount(total.max(Decimal::ZERO), "total_price")
}

/// Create quotation request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuotation {
    #[validate(length(min = 1, max = 255))]
    pub client_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_country: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub tour_name: String,
    /// YYYY-MM-DD
    pub tour_date: Option<String>,
    #[validate(range(min = 1, max = 999))]
    pub passenger_count: i32,
    pub unit_price: Decimal,
    pub discount_value: Option<Decimal>,
    pub discount_kind: Option<DiscountKind>,
    pub currency: Option<Currency>,
    #[validate(range(min = 1, max = 365))]
    pub validity_days: Option<i32>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_instructions: Option<String>,
    #[serde(default)]
    pub costs: Vec<CostItem>,
    pub margin_notes: Option<String>,
}

/// Update quotation request (all fields optional)
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuotation {
    pub client_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_country: Option<String>,
    pub tour_name: Option<String>,
    pub tour_date: Option<String>,
    #[validate(range(min = 1, max = 999))]
    pub passenger_count: Option<i32>,
    pub unit_price: Option<Decimal>,
    pub discount_value: Option<Decimal>,
    pub discount_kind: Option<DiscountKind>,
    pub currency: Option<Currency>,
    #[validate(range(min = 1, max = 365))]
    pub validity_days: Option<i32>,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_instructions: Option<String>,
    pub costs: Option<Vec<CostItem>>,
    pub margin_notes: Option<String>,
}

/// Sanitized quotation with computed total, written as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuotation {
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_country: Option<String>,
    pub tour_name: String,
    pub tour_date: Option<NaiveDate>,
    pub passenger_count: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub discount_value: Decimal,
    pub discount_kind: DiscountKind,
    pub currency: Currency,
    pub validity_days: i32,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_instructions: Option<String>,
    pub costs: Vec<CostItem>,
    pub margin_notes: Option<String>,
}

fn normalize_costs(costs: &[CostItem]) -> AppResult<Vec<CostItem>> {
    costs
        .iter()
        .map(|c| {
            let concept = require(sanitize::text(&c.concept), "costs.concept")?;
            Ok(CostItem {
                concept,
                amount: check_amount(c.amount, "costs.amount")?,
            })
        })
        .collect()
}

impl CreateQuotation {
    pub fn normalize(&self) -> AppResult<NewQuotation> {
        self.validate()?;

        let unit_price = check_amount(self.unit_price, "unit_price")?;
        let discount_value = check_amount(self.discount_value.unwrap_or(Decimal::ZERO), "discount_value")?;
        let discount_kind = self.discount_kind.unwrap_or_default();
        let total_price = compute_total(unit_price, self.passenger_count, discount_value, discount_kind)?;

        Ok(NewQuotation {
            client_name: require(sanitize::text(&self.client_name), "client_name")?,
            client_email: require(sanitize::email(&self.client_email), "client_email")?,
            client_phone: sanitize::optional(self.client_phone.as_deref()),
            client_country: sanitize::optional(self.client_country.as_deref()),
            tour_name: require(sanitize::text(&self.tour_name), "tour_name")?,
            tour_date: parse_optional_date(self.tour_date.as_deref(), "tour_date")?,
            passenger_count: self.passenger_count,
            unit_price,
            total_price,
            discount_value,
            discount_kind,
            currency: self.currency.unwrap_or_default(),
            validity_days: self.validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
            notes: sanitize::optional_textarea(self.notes.as_deref()),
            terms: sanitize::optional_textarea(self.terms.as_deref()),
            payment_instructions: sanitize::optional_textarea(self.payment_instructions.as_deref()),
            costs: normalize_costs(&self.costs)?,
            margin_notes: sanitize::optional_textarea(self.margin_notes.as_deref()),
        })
    }
}

impl UpdateQuotation {
    /// Overlay the provided fields on an existing quotation and recompute the total
    pub fn merge_into(&self, current: &Quotation) -> AppResult<NewQuotation> {
        self.validate()?;

        let passenger_count = self.passenger_count.unwrap_or(current.passenger_count);
        let unit_price = check_amount(self.unit_price.unwrap_or(current.unit_price), "unit_price")?;
        let discount_value = check_amount(
            self.discount_value.unwrap_or(current.discount_value),
            "discount_value",
        )?;
        let discount_kind = self.discount_kind.unwrap_or(current.discount_kind);
        let total_price = compute_total(unit_price, passenger_count, discount_value, discount_kind)?;

        let client_name = match &self.client_name {
            Some(v) => require(sanitize::text(v), "client_name")?,
            None => current.client_name.clone(),
        };
        let client_email = match &self.client_email {
            Some(v) => require(sanitize::email(v), "client_email")?,
            None => current.client_email.clone(),
        };
        let tour_name = match &self.tour_name {
            Some(v) => require(sanitize::text(v), "tour_name")?,
            None => current.tour_name.clone(),
        };
        let tour_date = match &self.tour_date {
            Some(v) => parse_optional_date(Some(v), "tour_date")?,
            None => current.tour_date,
        };
        let costs = match &self.costs {
            Some(costs) => normalize_costs(costs)?,
            None => current.costs.0.clone(),
        };

        Ok(NewQuotation {
            client_name,
            client_email,
            client_phone: overlay(&self.client_phone, &current.client_phone, sanitize::optional),
            client_country: overlay(&self.client_country, &current.client_country, sanitize::optional),
            tour_name,
            tour_date,
            passenger_count,
            unit_price,
            total_price,
            discount_value,
            discount_kind,
            currency: self.currency.unwrap_or(current.currency),
            validity_days: self.validity_days.unwrap_or(current.validity_days),
            notes: overlay(&self.notes, &current.notes, sanitize::optional_textarea),
            terms: overlay(&self.terms, &current.terms, sanitize::optional_textarea),
            payment_instructions: overlay(
                &self.payment_instructions,
                &current.payment_instructions,
                sanitize::optional_textarea,
            ),
            costs,
            margin_notes: overlay(&self.margin_notes, &current.margin_notes, sanitize::optional_textarea),
        })
    }
}

/// A provided value replaces the current one (blank clears it)
fn overlay(
    update: &Option<String>,
    current: &Option<String>,
    clean: fn(Option<&str>) -> Option<String>,
) -> Option<String> {
    match update {
        Some(v) => clean(Some(v)),
        None => current.clone(),
    }
}

/// Query parameters for the quotation list
#[derive(Debug, Default, Deserialize)]
pub struct QuotationQuery {
    /// Admins only; sellers are always scoped to themselves
    pub seller_id: Option<i32>,
    pub status: Option<String>,
    /// Matches code, client name, client email or tour name
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct QuotationFilter {
    pub seller_id: Option<i32>,
    pub status: Option<QuotationStatus>,
    pub search: Option<String>,
    pub pagination: Pagination,
}

impl QuotationQuery {
    pub fn into_filter(self) -> AppResult<QuotationFilter> {
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<QuotationStatus>()?),
            None => None,
        };
        Ok(QuotationFilter {
            seller_id: self.seller_id,
            status,
            search: sanitize::optional(self.search.as_deref()),
            pagination: Pagination::new(self.page, self.per_page),
        })
    }
}

/// Per-seller counters, computed with effective (expiry-aware) statuses
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct SellerStats {
    pub total: i64,
    pub draft: i64,
    pub sent: i64,
    pub accepted: i64,
    pub expired: i64,
    /// Sum of accepted quotation totals
    pub accepted_total: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct LinkReservationRequest {
    pub reservation_id: i32,
}
