//! Online payments: order creation and capture routed back to the store

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::{Money, QUOTATION_CODE_PREFIX, RESERVATION_CODE_PREFIX},
    services::{quotations::QuotationsService, reservations::ReservationsService},
};

/// Order to be paid by the customer
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    /// Reservation or quotation code, echoed back on capture
    pub reference_id: String,
    pub description: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: String,
    pub status: String,
    /// Where the customer approves the payment
    pub approve_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapturedOrder {
    pub id: String,
    pub status: String,
    pub reference_id: Option<String>,
}

impl CapturedOrder {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, order: &OrderRequest) -> AppResult<Order>;
    async fn capture_order(&self, order_id: &str) -> AppResult<CapturedOrder>;
}

/// What a payment reference points at, decided by its code prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTarget {
    Reservation(String),
    Quotation(String),
}

impl PaymentTarget {
    pub fn from_reference(reference: &str) -> AppResult<Self> {
        let code = reference.trim().to_uppercase();
        match code.split('-').next() {
            Some(RESERVATION_CODE_PREFIX) => Ok(PaymentTarget::Reservation(code)),
            Some(QUOTATION_CODE_PREFIX) => Ok(PaymentTarget::Quotation(code)),
            _ => Err(AppError::Validation(format!(
                "Unknown payment reference: {}",
                reference
            ))),
        }
    }
}

/// Gateway order ids are short uppercase alphanumeric tokens
pub fn validate_order_id(order_id: &str) -> AppResult<()> {
    let valid = !order_id.is_empty()
        && order_id.len() <= 36
        && order_id
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid order id: {}", order_id)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Reservation or quotation code
    pub reference: String,
}

/// Outcome of a capture, including the store record that was updated
#[derive(Debug, Serialize)]
pub struct CaptureResult {
    pub order: CapturedOrder,
    pub reference: String,
    pub target: &'static str,
}

#[derive(Clone)]
pub struct PaymentsService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    reservations: ReservationsService,
    quotations: QuotationsService,
}

impl PaymentsService {
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        reservations: ReservationsService,
        quotations: QuotationsService,
    ) -> Self {
        Self {
            gateway,
            reservations,
            quotations,
        }
    }

    fn gateway(&self) -> AppResult<&dyn PaymentGateway> {
        self.gateway
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Online payments are not enabled".to_string()))
    }

    /// Open an order for the amount stored on the reservation or quotation
    pub async fn create_order(&self, reference: &str) -> AppResult<Order> {
        let gateway = self.gateway()?;
        let request = match PaymentTarget::from_reference(reference)? {
            PaymentTarget::Reservation(code) => {
                let details = self.reservations.get_by_code(&code).await?;
                let r = details.reservation;
                OrderRequest {
                    description: format!("{} - {}", r.tour_name, r.tour_date),
                    amount: r.price(),
                    reference_id: r.code,
                }
            }
            PaymentTarget::Quotation(code) => {
                let q = self.quotations.get_by_code(&code).await?;
                OrderRequest {
                    description: q.tour_name.clone(),
                    amount: Money::new(q.total_price, q.currency),
                    reference_id: q.code,
                }
            }
        };

        if request.amount.amount.is_zero() {
            return Err(AppError::BusinessRule(format!(
                "{} has no amount to pay",
                request.reference_id
            )));
        }

        let order = gateway.create_order(&request).await?;
        tracing::info!("Created payment order {} for {}", order.id, request.reference_id);
        Ok(order)
    }

    /// Capture an approved order and mark the referenced record as paid/accepted
    pub async fn capture_order(&self, order_id: &str) -> AppResult<CaptureResult> {
        let gateway = self.gateway()?;
        validate_order_id(order_id)?;
        let order = gateway.capture_order(order_id).await?;
        let target = capture_target(&order)?;

        let (reference, kind) = match target {
            PaymentTarget::Reservation(code) => {
                self.reservations.mark_paid_by_code(&code).await?;
                (code, "reservation")
            }
            PaymentTarget::Quotation(code) => {
                self.quotations.mark_accepted_by_code(&code).await?;
                (code, "quotation")
            }
        };
        tracing::info!("Payment order {} captured for {}", order.id, reference);

        Ok(CaptureResult {
            order,
            reference,
            target: kind,
        })
    }
}

/// A capture only updates the store when the gateway reports it completed
fn capture_target(order: &CapturedOrder) -> AppResult<PaymentTarget> {
    if !order.is_completed() {
        return Err(AppError::Gateway(format!(
            "Order {} was not completed (status {})",
            order.id, order.status
        )));
    }
    let reference = order
        .reference_id
        .as_deref()
        .ok_or_else(|| AppError::Gateway(format!("Order {} has no reference", order.id)))?;
    PaymentTarget::from_reference(reference)
}
