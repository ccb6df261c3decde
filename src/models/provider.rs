//! Provider catalog (guides, transport, hotels, ...)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{
    enums::{Currency, ProviderType},
    money::check_amount,
    require,
};
use crate::{error::AppResult, sanitize};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: i32,
    pub provider_type: ProviderType,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub base_cost: Decimal,
    pub currency: Currency,
    pub active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProvider {
    pub provider_type: ProviderType,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub base_cost: Option<Decimal>,
    pub currency: Option<Currency>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProvider {
    pub provider_type: Option<ProviderType>,
    pub name: Option<String>,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub base_cost: Option<Decimal>,
    pub currency: Option<Currency>,
    pub active: Option<bool>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProvider {
    pub provider_type: ProviderType,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub base_cost: Decimal,
    pub currency: Currency,
    pub active: bool,
    pub notes: Option<String>,
}

fn check_cost(cost: Decimal) -> AppResult<Decimal> {
    check_amount(cost, "base_cost")
}

impl CreateProvider {
    pub fn normalize(&self) -> AppResult<NewProvider> {
        self.validate()?;
        Ok(NewProvider {
            provider_type: self.provider_type,
            name: require(sanitize::text(&self.name), "name")?,
            contact_name: sanitize::optional(self.contact_name.as_deref()),
            phone: sanitize::optional(self.phone.as_deref()),
            email: self.email.as_deref().map(sanitize::email).filter(|e| !e.is_empty()),
            base_cost: check_cost(self.base_cost.unwrap_or(Decimal::ZERO))?,
            currency: self.currency.unwrap_or_default(),
            active: self.active.unwrap_or(true),
            notes: sanitize::optional_textarea(self.notes.as_deref()),
        })
    }
}

impl UpdateProvider {
    pub fn merge_into(&self, current: &Provider) -> AppResult<NewProvider> {
        self.validate()?;
        let name = match &self.name {
            Some(v) => require(sanitize::text(v), "name")?,
            None => current.name.clone(),
        };
        let email = match &self.email {
            Some(v) => Some(sanitize::email(v)).filter(|e| !e.is_empty()),
            None => current.email.clone(),
        };
        Ok(NewProvider {
            provider_type: self.provider_type.unwrap_or(current.provider_type),
            name,
            contact_name: match &self.contact_name {
                Some(v) => sanitize::optional(Some(v)),
                None => current.contact_name.clone(),
            },
            phone: match &self.phone {
                Some(v) => sanitize::optional(Some(v)),
                None => current.phone.clone(),
            },
            email,
            base_cost: check_cost(self.base_cost.unwrap_or(current.base_cost))?,
            currency: self.currency.unwrap_or(current.currency),
            active: self.active.unwrap_or(current.active),
            notes: match &self.notes {
                Some(v) => sanitize::optional_textarea(Some(v)),
                None => current.notes.clone(),
            },
        })
    }
}

/// Query parameters for the provider list
#[derive(Debug, Default, Deserialize)]
pub struct ProviderQuery {
    pub provider_type: Option<ProviderType>,
    pub active: Option<bool>,
    /// Matches name or contact name
    pub search: Option<String>,
}
