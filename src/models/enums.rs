//! Closed domain enums, stored as PostgreSQL enum types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

/// Reservation lifecycle: pendiente -> confirmada -> pagada -> completada,
/// with cancelada reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status")]
pub enum ReservationStatus {
    #[serde(rename = "pendiente")]
    #[sqlx(rename = "pendiente")]
    Pending,
    #[serde(rename = "confirmada")]
    #[sqlx(rename = "confirmada")]
    Confirmed,
    #[serde(rename = "pagada")]
    #[sqlx(rename = "pagada")]
    Paid,
    #[serde(rename = "completada")]
    #[sqlx(rename = "completada")]
    Completed,
    #[serde(rename = "cancelada")]
    #[sqlx(rename = "cancelada")]
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 5] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Paid,
        ReservationStatus::Completed,
        ReservationStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pendiente",
            ReservationStatus::Confirmed => "confirmada",
            ReservationStatus::Paid => "pagada",
            ReservationStatus::Completed => "completada",
            ReservationStatus::Cancelled => "cancelada",
        }
    }

    /// Completed and cancelled reservations are locked.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    /// Rewriting the current status is a no-op and always allowed.
    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        *self == next || !self.is_terminal()
    }
}

impl FromStr for ReservationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReservationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| AppError::Validation(format!("Invalid reservation status: {}", s)))
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// QuotationStatus
// ---------------------------------------------------------------------------

/// Quotation lifecycle: borrador -> enviada -> aceptada. `Expired` is never
/// written by the server, it is derived from the validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quotation_status")]
pub enum QuotationStatus {
    #[serde(rename = "borrador")]
    #[sqlx(rename = "borrador")]
    Draft,
    #[serde(rename = "enviada")]
    #[sqlx(rename = "enviada")]
    Sent,
    #[serde(rename = "aceptada")]
    #[sqlx(rename = "aceptada")]
    Accepted,
    #[serde(rename = "vencida")]
    #[sqlx(rename = "vencida")]
    Expired,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "borrador",
            QuotationStatus::Sent => "enviada",
            QuotationStatus::Accepted => "aceptada",
            QuotationStatus::Expired => "vencida",
        }
    }

    /// Drafts and sent quotations can still be edited and re-sent.
    pub fn is_open(&self) -> bool {
        matches!(self, QuotationStatus::Draft | QuotationStatus::Sent)
    }
}

impl FromStr for QuotationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "borrador" => Ok(QuotationStatus::Draft),
            "enviada" => Ok(QuotationStatus::Sent),
            "aceptada" => Ok(QuotationStatus::Accepted),
            "vencida" => Ok(QuotationStatus::Expired),
            other => Err(AppError::Validation(format!("Invalid quotation status: {}", other))),
        }
    }
}

impl std::fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DiscountKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "discount_kind", rename_all = "lowercase")]
pub enum DiscountKind {
    #[default]
    Amount,
    Percentage,
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "currency_code")]
pub enum Currency {
    #[default]
    USD,
    PEN,
    EUR,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::PEN => "PEN",
            Currency::EUR => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::PEN => "S/",
            Currency::EUR => "€",
        }
    }
}

impl FromStr for Currency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" | "$" | "US$" => Ok(Currency::USD),
            "PEN" | "S/" | "S/." => Ok(Currency::PEN),
            "EUR" | "€" => Ok(Currency::EUR),
            other => Err(AppError::Validation(format!("Unsupported currency: {}", other))),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ProviderType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "provider_type")]
pub enum ProviderType {
    #[serde(rename = "guia")]
    #[sqlx(rename = "guia")]
    Guide,
    #[serde(rename = "transporte")]
    #[sqlx(rename = "transporte")]
    Transport,
    #[serde(rename = "hotel")]
    #[sqlx(rename = "hotel")]
    Hotel,
    #[serde(rename = "restaurante")]
    #[sqlx(rename = "restaurante")]
    Restaurant,
    #[serde(rename = "entrada")]
    #[sqlx(rename = "entrada")]
    Entrance,
    #[serde(rename = "otro")]
    #[sqlx(rename = "otro")]
    Other,
}

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "gender")]
pub enum Gender {
    M,
    F,
}

// ---------------------------------------------------------------------------
// TrackingEventType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tracking_event_type", rename_all = "snake_case")]
pub enum TrackingEventType {
    FormOpen,
    StepView,
    StepComplete,
    FormSubmit,
    FormClose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_reservation_statuses() {
        for status in ReservationStatus::ALL {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), status);
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let err = "bogus".parse::<ReservationStatus>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn non_terminal_states_move_freely() {
        use ReservationStatus::*;
        assert!(Pending.can_transition_to(Paid));
        assert!(Confirmed.can_transition_to(Pending));
        assert!(Paid.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Completed));
    }

    #[test]
    fn terminal_states_are_locked() {
        use ReservationStatus::*;
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn currency_accepts_symbols() {
        assert_eq!("S/".parse::<Currency>().unwrap(), Currency::PEN);
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::USD);
        assert!("GBP".parse::<Currency>().is_err());
    }

    #[test]
    fn status_serializes_with_spanish_names() {
        let json = serde_json::to_string(&ReservationStatus::Paid).unwrap();
        assert_eq!(json, "\"pagada\"");
        let back: QuotationStatus = serde_json::from_str("\"enviada\"").unwrap();
        assert_eq!(back, QuotationStatus::Sent);
    }
}
