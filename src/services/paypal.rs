//! PayPal Orders v2 client

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::PaymentsConfig,
    error::{AppError, AppResult},
    services::{
        cache::Cache,
        payments::{validate_order_id, CapturedOrder, Order, OrderRequest, PaymentGateway},
    },
};

/// Token refresh margin before the server-side expiry
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Link {
    href: String,
    rel: String,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    status: String,
    #[serde(default)]
    links: Vec<Link>,
}

#[derive(Deserialize)]
struct PurchaseUnit {
    reference_id: Option<String>,
}

#[derive(Deserialize)]
struct CaptureResponse {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Serialize)]
struct Amount<'a> {
    currency_code: &'a str,
    value: String,
}

#[derive(Clone)]
pub struct PayPalClient {
    http: Client,
    config: PaymentsConfig,
    cache: Arc<dyn Cache>,
    token_key: String,
}

impl PayPalClient {
    pub fn new(config: PaymentsConfig, cache: Arc<dyn Cache>, token_key: String) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            config,
            cache,
            token_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Client-credentials token, reused from the cache while it is valid
    async fn access_token(&self) -> AppResult<String> {
        match self.cache.get(&self.token_key).await {
            Ok(Some(token)) => return Ok(token),
            Ok(None) => {}
            Err(e) => tracing::warn!("PayPal token cache read failed: {}", e),
        }

        let response = self
            .http
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("PayPal token request failed: {}", e)))?;
        let token: TokenResponse = read_json(response, "token").await?;

        let ttl = token_ttl(self.config.token_ttl_seconds, token.expires_in);
        if let Err(e) = self.cache.set(&self.token_key, &token.access_token, ttl).await {
            tracing::warn!("PayPal token cache write failed: {}", e);
        }
        Ok(token.access_token)
    }
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_order(&self, order: &OrderRequest) -> AppResult<Order> {
        let token = self.access_token().await?;
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "reference_id": order.reference_id,
                "description": order.description,
                "amount": Amount {
                    currency_code: order.amount.currency.as_str(),
                    value: format!("{:.2}", order.amount.amount),
                },
            }],
            "application_context": {
                "return_url": self.config.return_url,
                "cancel_url": self.config.cancel_url,
            },
        });

        let response = self
            .http
            .post(self.url("/v2/checkout/orders"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("PayPal order request failed: {}", e)))?;
        let created: OrderResponse = read_json(response, "order").await?;

        let approve_url = approve_link(&created.links);
        Ok(Order {
            id: created.id,
            status: created.status,
            approve_url,
        })
    }

    async fn capture_order(&self, order_id: &str) -> AppResult<CapturedOrder> {
        validate_order_id(order_id)?;
        let token = self.access_token().await?;
        let response = self
            .http
            .post(self.url(&format!("/v2/checkout/orders/{}/capture", order_id)))
            .bearer_auth(&token)
            .header(header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("PayPal capture request failed: {}", e)))?;
        let captured: CaptureResponse = read_json(response, "capture").await?;

        Ok(CapturedOrder {
            reference_id: captured
                .purchase_units
                .into_iter()
                .find_map(|u| u.reference_id),
            id: captured.id,
            status: captured.status,
        })
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response, what: &str) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Gateway(format!(
            "PayPal {} request returned {}: {}",
            what, status, body
        )));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| AppError::Gateway(format!("Invalid PayPal {} response: {}", what, e)))
}

fn approve_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel == "approve" || l.rel == "payer-action")
        .map(|l| l.href.clone())
}

/// Configured TTL, shortened so the cached token never outlives the real one
fn token_ttl(configured_secs: u64, expires_in: u64) -> Duration {
    let server = expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS).max(1);
    Duration::from_secs(configured_secs.min(server).max(1))
}
