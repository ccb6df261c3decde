//! Quotation endpoints. Sellers work on their own quotations, admins on all.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        quotation::{
            CreateQuotation, LinkReservationRequest, QuotationQuery, QuotationView, SellerStats,
            UpdateQuotation,
        },
        PaginatedResponse,
    },
    services::email::Attachment,
};

use super::AuthenticatedUser;

/// Rendered document to attach to the quotation email
#[derive(Debug, Deserialize)]
pub struct AttachmentUpload {
    pub filename: String,
    pub content_type: Option<String>,
    /// Base64 encoded file content
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendQuotationRequest {
    pub attachment: Option<AttachmentUpload>,
}

#[derive(Debug, Deserialize)]
pub struct SellerStatsQuery {
    pub seller_id: Option<i32>,
}

impl AttachmentUpload {
    fn decode(self) -> AppResult<Attachment> {
        let filename = crate::sanitize::text(&self.filename).replace(&['/', '\\'][..], "_");
        if filename.is_empty() {
            return Err(AppError::Validation("attachment.filename is required".to_string()));
        }
        let content = STANDARD
            .decode(self.content.trim())
            .map_err(|e| AppError::Validation(format!("Invalid attachment content: {}", e)))?;
        Ok(Attachment {
            filename,
            content_type: self
                .content_type
                .unwrap_or_else(|| "application/pdf".to_string()),
            content,
        })
    }
}

pub async fn list_quotations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<QuotationQuery>,
) -> AppResult<Json<PaginatedResponse<QuotationView>>> {
    let mut filter = query.into_filter()?;
    if let Some(seller) = claims.seller_scope() {
        filter.seller_id = Some(seller);
    }
    Ok(Json(state.services.quotations.list(&filter).await?))
}

/// Create a quotation owned by the calling seller
pub async fn create_quotation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateQuotation>,
) -> AppResult<(StatusCode, Json<QuotationView>)> {
    let quotation = state
        .services
        .quotations
        .create(claims.user_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

pub async fn get_quotation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<QuotationView>> {
    Ok(Json(
        state.services.quotations.get(id, claims.seller_scope()).await?,
    ))
}

pub async fn update_quotation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateQuotation>,
) -> AppResult<Json<QuotationView>> {
    let quotation = state
        .services
        .quotations
        .update(id, claims.seller_scope(), &request)
        .await?;
    Ok(Json(quotation))
}

pub async fn delete_quotation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .quotations
        .delete(id, claims.seller_scope())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Email the quotation to the client
pub async fn send_quotation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<SendQuotationRequest>,
) -> AppResult<Json<QuotationView>> {
    let attachment = request.attachment.map(AttachmentUpload::decode).transpose()?;
    let quotation = state
        .services
        .quotations
        .send(id, claims.seller_scope(), attachment)
        .await?;
    Ok(Json(quotation))
}

pub async fn link_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<LinkReservationRequest>,
) -> AppResult<Json<QuotationView>> {
    let quotation = state
        .services
        .quotations
        .link_reservation(id, claims.seller_scope(), request.reservation_id)
        .await?;
    Ok(Json(quotation))
}

/// Counters for the caller (sellers) or any/all sellers (admins)
pub async fn get_seller_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<SellerStatsQuery>,
) -> AppResult<Json<SellerStats>> {
    let seller = claims.seller_scope().or(query.seller_id);
    Ok(Json(state.services.quotations.seller_stats(seller).await?))
}
