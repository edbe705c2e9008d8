use crate::{errors::ServiceError, models::order::Order};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, instrument};

/// Form name expected by the capture endpoint.
pub const FORM_NAME: &str = "order";

/// The form-encoded submission sent to the order sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSubmission {
    pub order_id: String,
    pub payment: String,
    pub name: String,
    pub phone: String,
    pub pickup: String,
    /// Plain-text kitchen ticket
    pub kitchen: String,
    /// Pretty-printed order payload
    pub order_json: String,
}

impl OrderSubmission {
    pub fn new(order: &Order, kitchen_ticket: String) -> Result<Self, ServiceError> {
        Ok(Self {
            order_id: order.id.clone(),
            payment: order.payment.to_string(),
            name: order.customer.name.clone(),
            phone: order.customer.phone.clone(),
            pickup: order.customer.pickup.clone(),
            kitchen: kitchen_ticket,
            order_json: serde_json::to_string_pretty(order)?,
        })
    }

    /// Form fields in submission order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("form-name", FORM_NAME),
            ("order-id", self.order_id.as_str()),
            ("payment", self.payment.as_str()),
            ("name", self.name.as_str()),
            ("phone", self.phone.as_str()),
            ("pickup", self.pickup.as_str()),
            ("kitchen", self.kitchen.as_str()),
            ("order-json", self.order_json.as_str()),
        ]
    }
}

/// Destination for completed orders.
#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn submit(&self, submission: &OrderSubmission) -> Result<(), ServiceError>;
}

/// Posts orders as `application/x-www-form-urlencoded` to a form-capture
/// endpoint. Transport failures and non-2xx responses are sink errors.
#[derive(Clone)]
pub struct HttpOrderSink {
    client: reqwest::Client,
    url: String,
}

impl HttpOrderSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::SinkError(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl OrderSink for HttpOrderSink {
    #[instrument(skip(self, submission), fields(order_id = %submission.order_id))]
    async fn submit(&self, submission: &OrderSubmission) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(&self.url)
            .form(&submission.fields())
            .send()
            .await
            .map_err(|e| {
                error!("Order submission failed: {}", e);
                ServiceError::SinkError(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Order sink responded with status: {}", status);
            return Err(ServiceError::SinkError(format!(
                "order sink responded with {}",
                status
            )));
        }

        info!("Order delivered to {}", self.url);
        Ok(())
    }
}
