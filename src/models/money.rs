//! Amount + currency pair

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::enums::Currency;
use crate::error::{AppError, AppResult};

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").unwrap());

/// Largest amount a `NUMERIC(12, 2)` column holds
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Round to cents and reject negative or out of range amounts
pub fn check_amount(value: Decimal, field: &str) -> AppResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::Validation(format!("{} cannot be negative", field)));
    }
    let rounded = value.round_dp(2);
    if rounded > max_amount() {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {}",
            field,
            max_amount()
        )));
    }
    Ok(rounded)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: Decimal,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Parse a free-text price as typed in the booking form, e.g. `"USD 150"`,
    /// `"$1,250.50"`, `"S/ 320"` or a bare `"99.90"` (uses `default_currency`).
    pub fn parse(input: &str, default_currency: Currency) -> AppResult<Self> {
        let found = AMOUNT_RE
            .find(input)
            .ok_or_else(|| AppError::Validation(format!("Invalid price: {}", input)))?;

        let amount = Decimal::from_str(&found.as_str().replace(',', ""))
            .map_err(|_| AppError::Validation(format!("Invalid price: {}", input)))?;
        let amount = check_amount(amount, "price")?;

        let rest = format!("{}{}", &input[..found.start()], &input[found.end()..]);
        let marker = rest.trim().to_uppercase();
        let currency = if marker.is_empty() {
            default_currency
        } else if marker.contains("PEN") || marker.contains("S/") {
            Currency::PEN
        } else if marker.contains("EUR") || marker.contains('€') {
            Currency::EUR
        } else if marker.contains("USD") || marker.contains('$') {
            Currency::USD
        } else {
            return Err(AppError::Validation(format!("Unsupported currency in price: {}", input)));
        };

        Ok(Self::new(amount, currency))
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.2}", self.currency.symbol(), self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_amounts() {
        let m = Money::parse("USD 150", Currency::PEN).unwrap();
        assert_eq!(m, Money::new(Decimal::new(150, 0), Currency::USD));

        let m = Money::parse("$1,250.50", Currency::PEN).unwrap();
        assert_eq!(m, Money::new(Decimal::new(125050, 2), Currency::USD));

        let m = Money::parse("S/ 320.00", Currency::USD).unwrap();
        assert_eq!(m.currency, Currency::PEN);
    }

    #[test]
    fn bare_amount_uses_default_currency() {
        let m = Money::parse("99.90", Currency::EUR).unwrap();
        assert_eq!(m, Money::new(Decimal::new(9990, 2), Currency::EUR));
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        assert!(Money::parse("free", Currency::USD).is_err());
        assert!(Money::parse("-5", Currency::USD).is_err());
        assert!(Money::parse("150 GBP", Currency::USD).is_err());
    }

    #[test]
    fn rejects_amounts_past_column_range() {
        assert!(Money::parse("USD 9,999,999,999.99", Currency::USD).is_ok());
        assert!(Money::parse("USD 10000000000", Currency::USD).is_err());
        assert!(Money::parse("79228162514264337593543950335", Currency::USD).is_err());
        assert!(Money::parse("1".repeat(40).as_str(), Currency::USD).is_err());
    }

    #[test]
    fn amounts_are_rounded_and_bounded() {
        assert_eq!(check_amount(Decimal::new(12346, 3), "x").unwrap(), Decimal::new(1235, 2));
        assert!(check_amount(Decimal::MAX, "x").is_err());
        assert!(check_amount(Decimal::new(-1, 2), "x").is_err());
        // 9 999 999 999.999 rounds past the bound
        assert!(check_amount(Decimal::new(9_999_999_999_999, 3), "x").is_err());
    }

    #[test]
    fn displays_with_symbol() {
        let m = Money::new(Decimal::new(32000, 2), Currency::PEN);
        assert_eq!(m.to_string(), "S/ 320.00");
    }
}
