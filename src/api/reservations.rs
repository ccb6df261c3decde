//! Reservation administration endpoints (admin only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{
        parse_date,
        reservation::{
            AlertsQuery, CalendarDay, CalendarQuery, CreatePassenger, CreateReservation,
            PendingAlert, Reservation, ReservationDetails, ReservationQuery, ReservationStats,
            UpdateNotesRequest, UpdateStatusRequest,
        },
        PaginatedResponse,
    },
};

use super::AuthenticatedUser;

#[derive(Serialize)]
pub struct EmailResponse {
    pub sent: bool,
}

/// List reservations with filters, sorting and pagination
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<PaginatedResponse<Reservation>>> {
    claims.require_admin()?;
    let filter = query.into_filter()?;
    let page = state.services.reservations.list(&filter).await?;
    Ok(Json(page))
}

/// Create a reservation on behalf of a customer (no confirmation email)
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<ReservationDetails>)> {
    claims.require_admin()?;
    let details = state.services.reservations.create(&request).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    Ok(Json(state.services.reservations.get(id).await?))
}

pub async fn get_reservation_by_code(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(code): Path<String>,
) -> AppResult<Json<ReservationDetails>> {
    claims.require_admin()?;
    Ok(Json(state.services.reservations.get_by_code(&code).await?))
}

pub async fn delete_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.reservations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> AppResult<Json<Reservation>> {
    claims.require_admin()?;
    let reservation = state
        .services
        .reservations
        .update_status(id, &request.status)
        .await?;
    Ok(Json(reservation))
}

pub async fn update_notes(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateNotesRequest>,
) -> AppResult<Json<Reservation>> {
    claims.require_admin()?;
    let reservation = state
        .services
        .reservations
        .update_notes(id, request.notes.as_deref())
        .await?;
    Ok(Json(reservation))
}

pub async fn add_passengers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(passengers): Json<Vec<CreatePassenger>>,
) -> AppResult<(StatusCode, Json<ReservationDetails>)> {
    claims.require_admin()?;
    let details = state.services.reservations.add_passengers(id, &passengers).await?;
    Ok((StatusCode::CREATED, Json(details)))
}

/// Send the booking confirmation again; delivery failures are returned
pub async fn resend_email(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<EmailResponse>> {
    claims.require_admin()?;
    state.services.reservations.send_confirmation(id).await?;
    Ok(Json(EmailResponse {
        sent: state.services.email.is_enabled(),
    }))
}

pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReservationStats>> {
    claims.require_admin()?;
    Ok(Json(state.services.reservations.stats().await?))
}

pub async fn list_tours(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<String>>> {
    claims.require_admin()?;
    Ok(Json(state.services.reservations.tours().await?))
}

/// Per-day summary for the calendar view
pub async fn get_calendar(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<CalendarQuery>,
) -> AppResult<Json<Vec<CalendarDay>>> {
    claims.require_admin()?;
    let from = parse_date(&query.from, "from")?;
    let to = parse_date(&query.to, "to")?;
    Ok(Json(state.services.reservations.calendar(from, to).await?))
}

pub async fn get_calendar_day(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(date): Path<String>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_admin()?;
    let date = parse_date(&date, "date")?;
    Ok(Json(state.services.reservations.day(date).await?))
}

/// Pending reservations whose tour is coming up
pub async fn pending_alerts(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AlertsQuery>,
) -> AppResult<Json<Vec<PendingAlert>>> {
    claims.require_admin()?;
    Ok(Json(
        state
            .services
            .reservations
            .pending_alerts(query.days_ahead)
            .await?,
    ))
}
