//! Public endpoints used by the booking form

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{
        reservation::{CreateReservation, ReservationDetails},
        tracking::CreateTrackingEvent,
    },
};

use super::ClientInfo;

#[derive(Serialize)]
pub struct BookingResponse {
    pub code: String,
    /// False when the confirmation email could not be delivered
    pub email_sent: bool,
    pub reservation: ReservationDetails,
}

#[derive(Serialize)]
pub struct TrackingResponse {
    pub id: i64,
}

/// Submit a booking. The confirmation email is best effort; its outcome
/// is recorded on the reservation.
pub async fn create_booking(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let reservation = state.services.reservations.create(&request).await?;
    let id = reservation.reservation.id;

    let email_sent = match state.services.reservations.send_confirmation(id).await {
        Ok(()) => state.services.email.is_enabled(),
        Err(e) => {
            tracing::warn!("Booking {} saved without confirmation email: {}", reservation.reservation.code, e);
            false
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            code: reservation.reservation.code.clone(),
            email_sent,
            reservation,
        }),
    ))
}

/// Record a booking form funnel event
pub async fn record_tracking_event(
    State(state): State<crate::AppState>,
    ClientInfo(ctx): ClientInfo,
    Json(request): Json<CreateTrackingEvent>,
) -> AppResult<(StatusCode, Json<TrackingResponse>)> {
    let id = state.services.tracking.record(&request, ctx).await?;
    Ok((StatusCode::CREATED, Json(TrackingResponse { id })))
}
