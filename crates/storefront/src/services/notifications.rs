//! Order notifications.
//!
//! Notifications are sent after the order has committed and their failures
//! never reach the customer. The orchestrator logs them and moves on.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use souk_core::{Cents, CurrencyCode, UserId};
use thiserror::Error;
use tracing::instrument;
use url::Url;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur when delivering a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("webhook returned status {0}")]
    Status(u16),
}

/// One item line in an admin notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationItem {
    pub name: String,
    pub quantity: u32,
}

/// Admin notification for a newly placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrderNotification {
    pub order_number: String,
    pub customer_name: String,
    pub total_cents: Cents,
    pub currency: CurrencyCode,
    pub user_id: Option<UserId>,
    pub items: Vec<NotificationItem>,
}

/// Delivers order notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_admin_new_order(
        &self,
        notification: &NewOrderNotification,
    ) -> Result<(), NotifyError>;

    async fn notify_customer_order_placed(
        &self,
        user_id: UserId,
        order_number: &str,
        total_cents: Cents,
    ) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used when no webhook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_admin_new_order(
        &self,
        notification: &NewOrderNotification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            order_number = %notification.order_number,
            customer = %notification.customer_name,
            total = %notification.total_cents,
            items = notification.items.len(),
            "New order"
        );
        Ok(())
    }

    async fn notify_customer_order_placed(
        &self,
        user_id: UserId,
        order_number: &str,
        total_cents: Cents,
    ) -> Result<(), NotifyError> {
        tracing::info!(%user_id, order_number, total = %total_cents, "Order placed for customer");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "event")]
enum WebhookEvent<'a> {
    #[serde(rename = "order.created")]
    OrderCreated(&'a NewOrderNotification),
    #[serde(rename = "order.customer_placed")]
    CustomerOrderPlaced {
        user_id: UserId,
        order_number: &'a str,
        total_cents: Cents,
    },
}

/// Posts notifications as JSON events to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    /// Create a new webhook notifier.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(url: Url) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;
        Ok(Self { client, url })
    }

    async fn post(&self, event: &WebhookEvent<'_>) -> Result<(), NotifyError> {
        let response = self.client.post(self.url.clone()).json(event).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip(self, notification), fields(order_number = %notification.order_number))]
    async fn notify_admin_new_order(
        &self,
        notification: &NewOrderNotification,
    ) -> Result<(), NotifyError> {
        self.post(&WebhookEvent::OrderCreated(notification)).await
    }

    #[instrument(skip(self))]
    async fn notify_customer_order_placed(
        &self,
        user_id: UserId,
        order_number: &str,
        total_cents: Cents,
    ) -> Result<(), NotifyError> {
        self.post(&WebhookEvent::CustomerOrderPlaced {
            user_id,
            order_number,
            total_cents,
        })
        .await
    }
}
