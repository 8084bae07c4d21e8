use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::Client;
use std::time::Duration;

use crate::alert::AlertDispatcher;
use crate::config::MonitorConfig;
use crate::error::Error;
use crate::registry::Target;

/// Result of checking one target once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The body contained at least one of the expected texts.
    Accessible { status: u16 },
    /// The site answered but none of the expected texts were found, so an
    /// alert was dispatched.
    AlertedInaccessible { status: u16 },
    TimedOut,
    RequestError(String),
}

/// Anything that can check a target. The scheduler only depends on this.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self, target: &Target) -> CheckOutcome;
}

/// Checks targets over HTTP and raises alerts on content mismatches.
#[derive(Debug, Clone)]
pub struct Checker {
    client: Client,
    timeout: Duration,
    alerts: AlertDispatcher,
}

impl Checker {
    /// Builds a checker with one HTTP client shared by every check and alert.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &MonitorConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(config.timeout_duration())
            .build()?;

        Ok(Self {
            alerts: AlertDispatcher::new(client.clone(), config),
            client,
            timeout: config.timeout_duration(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<(u16, String), reqwest::Error> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl Probe for Checker {
    async fn check(&self, target: &Target) -> CheckOutcome {
        let url = target.url.as_str();

        let (status, body) = match self.fetch(url).await {
            Ok(fetched) => fetched,
            Err(e) if e.is_timeout() => {
                error!("{url}: Request to {url} timed out.");
                return CheckOutcome::TimedOut;
            }
            Err(e) => {
                error!("{url}: Error occurred during the request: {e}");
                return CheckOutcome::RequestError(e.to_string());
            }
        };

        if body_matches(&body, &target.match_texts) {
            info!("{url}: accessible over the internet.");
            info!("{url}: Server returned status code {status}.");
            CheckOutcome::Accessible { status }
        } else {
            warn!("{url}: ALERT! Website is not accessible over the internet.");
            info!("{url}: Server returned status code {status}.");
            self.alerts.dispatch(url).await;
            CheckOutcome::AlertedInaccessible { status }
        }
    }
}

/// True when any expected text occurs in the body. An empty list never
/// matches.
pub fn body_matches(body: &str, texts: &[String]) -> bool {
    texts.iter().any(|text| body.contains(text.as_str()))
}
