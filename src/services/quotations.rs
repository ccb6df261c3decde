//! Quotations service

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        generate_code,
        quotation::{CreateQuotation, QuotationFilter, QuotationView, SellerStats, UpdateQuotation},
        PaginatedResponse, Quotation, QuotationStatus, QUOTATION_CODE_PREFIX,
    },
    repository::Repository,
    services::email::{Attachment, EmailService},
};

#[derive(Clone)]
pub struct QuotationsService {
    repository: Repository,
    email: EmailService,
}

impl QuotationsService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    pub async fn create(&self, seller_id: i32, input: &CreateQuotation) -> AppResult<QuotationView> {
        let data = input.normalize()?;
        let code = generate_code(QUOTATION_CODE_PREFIX, Utc::now().date_naive());
        let quotation = self.repository.quotations.create(&code, seller_id, &data).await?;
        tracing::info!(
            "Seller {} created quotation {} (total {})",
            seller_id,
            quotation.code,
            quotation.total_price
        );
        Ok(quotation.into_view(Utc::now()))
    }

    pub async fn get(&self, id: i32, scope: Option<i32>) -> AppResult<QuotationView> {
        let quotation = self.repository.quotations.get_by_id(id, scope).await?;
        Ok(quotation.into_view(Utc::now()))
    }

    pub async fn list(&self, filter: &QuotationFilter) -> AppResult<PaginatedResponse<QuotationView>> {
        let (rows, total) = self.repository.quotations.list(filter).await?;
        let now = Utc::now();
        let items = rows.into_iter().map(|q| q.into_view(now)).collect();
        Ok(PaginatedResponse::new(items, total, filter.pagination))
    }

    /// Partial update with totals recomputed. Accepted quotations are frozen.
    pub async fn update(&self, id: i32, scope: Option<i32>, input: &UpdateQuotation) -> AppResult<QuotationView> {
        let current = self.repository.quotations.get_by_id(id, scope).await?;
        ensure_editable(&current)?;

        let data = input.merge_into(&current)?;
        let updated = self.repository.quotations.update(id, &data).await?;
        tracing::info!("Updated quotation {}", updated.code);
        Ok(updated.into_view(Utc::now()))
    }

    pub async fn delete(&self, id: i32, scope: Option<i32>) -> AppResult<()> {
        self.repository.quotations.delete(id, scope).await?;
        tracing::info!("Deleted quotation {}", id);
        Ok(())
    }

    /// Email the quotation to the client, then mark it `enviada`.
    /// With email disabled nothing is read or written.
    pub async fn send(&self, id: i32, scope: Option<i32>, attachment: Option<Attachment>) -> AppResult<QuotationView> {
        if !self.email.is_enabled() {
            return Err(AppError::BadRequest("Email is not enabled".to_string()));
        }

        let current = self.repository.quotations.get_by_id(id, scope).await?;
        ensure_editable(&current)?;

        self.email.send_quotation(&current, attachment).await?;
        let sent = self.repository.quotations.mark_sent(id).await?;
        tracing::info!("Quotation {} sent to {}", sent.code, sent.client_email);
        Ok(sent.into_view(Utc::now()))
    }

    /// Payment capture: the quotation becomes `aceptada`
    pub async fn mark_accepted(&self, id: i32) -> AppResult<QuotationView> {
        let accepted = self.repository.quotations.mark_accepted(id).await?;
        tracing::info!("Quotation {} accepted", accepted.code);
        Ok(accepted.into_view(Utc::now()))
    }

    pub async fn mark_accepted_by_code(&self, code: &str) -> AppResult<QuotationView> {
        let quotation = self.repository.quotations.get_by_code(code).await?;
        self.mark_accepted(quotation.id).await
    }

    pub async fn get_by_code(&self, code: &str) -> AppResult<Quotation> {
        self.repository.quotations.get_by_code(code.trim()).await
    }

    pub async fn link_reservation(&self, id: i32, scope: Option<i32>, reservation_id: i32) -> AppResult<QuotationView> {
        self.repository.quotations.get_by_id(id, scope).await?;
        let reservation = self.repository.reservations.get_by_id(reservation_id).await?;

        let linked = self
            .repository
            .quotations
            .link_reservation(id, reservation.id)
            .await?;
        tracing::info!("Quotation {} linked to reservation {}", linked.code, reservation.code);
        Ok(linked.into_view(Utc::now()))
    }

    pub async fn seller_stats(&self, seller: Option<i32>) -> AppResult<SellerStats> {
        self.repository.quotations.seller_stats(seller).await
    }
}

fn ensure_editable(quotation: &Quotation) -> AppResult<()> {
    if quotation.status.is_open() {
        Ok(())
    } else {
        Err(AppError::BusinessRule(format!(
            "Quotation {} is {} and can no longer be modified",
            quotation.code, quotation.status
        )))
    }
}
