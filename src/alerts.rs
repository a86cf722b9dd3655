use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::AlertEvent;

/// Hands alert events to whatever delivers them.
///
/// Delivery problems stay inside the dispatcher; polling never waits on or
/// fails because of them.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, alert: &AlertEvent);
}

/// Logs every alert at `warn`
#[derive(Debug, Clone, Default)]
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn dispatch(&self, alert: &AlertEvent) {
        warn!(
            port = alert.port.port_id,
            olt = alert.port.olt_id,
            kind = %alert.kind,
            "{}: {}",
            alert.port.port_name,
            alert.message
        );
    }
}

/// Posts alerts as JSON to a webhook, after logging them
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    client: Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AlertDispatcher for WebhookDispatcher {
    #[instrument(skip_all, fields(port = alert.port.port_id, kind = %alert.kind))]
    async fn dispatch(&self, alert: &AlertEvent) {
        LogDispatcher.dispatch(alert).await;

        let payload = json!({
            "kind": alert.kind,
            "port_id": alert.port.port_id,
            "olt_id": alert.port.olt_id,
            "port_name": alert.port.port_name,
            "message": alert.message,
            "value": alert.value,
            "timestamp": Utc::now().to_rfc3339()
        });

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
            }
        }
    }
}
