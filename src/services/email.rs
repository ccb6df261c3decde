//! Email service for booking confirmations and quotations

use lettre::{
    message::{
        header::ContentType, Attachment as AttachmentPart, Mailbox, Message, MultiPart, SinglePart,
    },
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::{quotation::Quotation, reservation::ReservationDetails, Money},
    sanitize::html_escape,
};

/// File attached to an outgoing message
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Confirmation to the representative, copied to the agency mailbox
    pub async fn send_booking_confirmation(&self, details: &ReservationDetails) -> AppResult<()> {
        let r = &details.reservation;
        let spanish = r.language.starts_with("es");
        let subject = if spanish {
            format!("Confirmación de reserva {}", r.code)
        } else {
            format!("Booking confirmation {}", r.code)
        };

        let price = r.price();
        let mut text = format!(
            "{}\n\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n{}: {}\n",
            if spanish { "Hemos recibido su reserva." } else { "We have received your booking." },
            if spanish { "Código" } else { "Code" },
            r.code,
            "Tour",
            r.tour_name,
            if spanish { "Fecha" } else { "Date" },
            r.tour_date,
            if spanish { "Pasajeros" } else { "Passengers" },
            r.passenger_count,
            if spanish { "Precio" } else { "Price" },
            price,
        );
        for p in &details.passengers {
            text.push_str(&format!("  - {} ({} {})\n", p.full_name, p.document_type, p.document_number));
        }

        let rows: String = details
            .passengers
            .iter()
            .map(|p| {
                format!(
                    "<tr><td>{}</td><td>{} {}</td><td>{}</td></tr>",
                    html_escape(&p.full_name),
                    html_escape(&p.document_type),
                    html_escape(&p.document_number),
                    html_escape(&p.nationality),
                )
            })
            .collect();
        let html = format!(
            r#"<html><body>
<h2>{code}</h2>
<p><strong>{tour}</strong><br>{date} · {count} pax · {price}</p>
<table>{rows}</table>
</body></html>"#,
            code = html_escape(&r.code),
            tour = html_escape(&r.tour_name),
            date = r.tour_date,
            count = r.passenger_count,
            price = html_escape(&price.to_string()),
            rows = rows,
        );

        let message = self.build_message(
            &r.email,
            self.config.admin_address.as_deref(),
            &subject,
            &text,
            &html,
            Vec::new(),
        )?;
        self.send(message).await
    }

    /// Quotation summary for the client with an optional rendered PDF
    pub async fn send_quotation(&self, quotation: &Quotation, attachment: Option<Attachment>) -> AppResult<()> {
        let total = Money::new(quotation.total_price, quotation.currency);
        let unit = Money::new(quotation.unit_price, quotation.currency);
        let subject = format!("Cotización {} - {}", quotation.code, quotation.tour_name);
        let date = quotation
            .tour_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        let text = format!(
            "{}\n\nTour: {}\nFecha: {}\nPasajeros: {}\nPrecio unitario: {}\nTotal: {}\nValidez: {} días\n\n{}",
            quotation.client_name,
            quotation.tour_name,
            date,
            quotation.passenger_count,
            unit,
            total,
            quotation.validity_days,
            quotation.payment_instructions.as_deref().unwrap_or(""),
        );

        let mut html = format!(
            r#"<html><body>
<h2>{code}</h2>
<p>{client}</p>
<table>
<tr><td>Tour</td><td>{tour}</td></tr>
<tr><td>Fecha</td><td>{date}</td></tr>
<tr><td>Pasajeros</td><td>{count}</td></tr>
<tr><td>Precio unitario</td><td>{unit}</td></tr>
<tr><td><strong>Total</strong></td><td><strong>{total}</strong></td></tr>
</table>
<p>Validez: {days} días</p>"#,
            code = html_escape(&quotation.code),
            client = html_escape(&quotation.client_name),
            tour = html_escape(&quotation.tour_name),
            date = date,
            count = quotation.passenger_count,
            unit = html_escape(&unit.to_string()),
            total = html_escape(&total.to_string()),
            days = quotation.validity_days,
        );
        for block in [&quotation.terms, &quotation.payment_instructions].into_iter().flatten() {
            html.push_str(&format!("<p>{}</p>", html_escape(block).replace('\n', "<br>")));
        }
        html.push_str("</body></html>");

        let message = self.build_message(
            &quotation.client_email,
            None,
            &subject,
            &text,
            &html,
            attachment.into_iter().collect(),
        )?;
        self.send(message).await
    }

    /// Assemble a text+HTML message, wrapped in multipart/mixed when files are attached
    pub fn build_message(
        &self,
        to: &str,
        bcc: Option<&str>,
        subject: &str,
        text: &str,
        html: &str,
        attachments: Vec<Attachment>,
    ) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Reservas");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let mut builder = Message::builder().from(from_mailbox).to(to_mailbox).subject(subject);
        if let Some(bcc) = bcc {
            let bcc_mailbox = Mailbox::from_str(bcc)
                .map_err(|e| AppError::Internal(format!("Invalid bcc address: {}", e)))?;
            builder = builder.bcc(bcc_mailbox);
        }

        let alternative = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(text.to_string()),
            )
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_HTML)
                    .body(html.to_string()),
            );

        let message = if attachments.is_empty() {
            builder.multipart(alternative)
        } else {
            let mut mixed = MultiPart::mixed().multipart(alternative);
            for file in attachments {
                let content_type = ContentType::parse(&file.content_type).map_err(|e| {
                    AppError::Validation(format!("Invalid attachment type {}: {}", file.content_type, e))
                })?;
                mixed = mixed.singlepart(AttachmentPart::new(file.filename).body(file.content, content_type));
            }
            builder.multipart(mixed)
        }
        .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        Ok(message)
    }

    async fn send(&self, message: Message) -> AppResult<()> {
        if !self.config.enabled {
            tracing::info!("Email disabled, not sending message");
            return Ok(());
        }

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        // SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}
