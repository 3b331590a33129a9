//! Outbound notifications (reset codes).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub principal_id: i32,
    pub username: String,
    pub recipient: String,
    pub channel: Channel,
    pub template: String,
    pub vars: BTreeMap<String, String>,
}

impl Notification {
    #[must_use]
    pub fn email(principal: &Principal, template: &str) -> Self {
        Self {
            principal_id: principal.id,
            username: principal.username.clone(),
            recipient: principal.email.clone(),
            channel: Channel::Email,
            template: template.to_string(),
            vars: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.insert(name.to_string(), value.into());
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the notification. `Ok(false)` means the channel refused or
    /// could not be reached; `Err` is reserved for faults in the caller's
    /// own infrastructure.
    async fn send(&self, notification: &Notification) -> anyhow::Result<bool>;
}

/// Writes notifications to the log. Template variables only appear at debug
/// level since they carry secrets.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<bool> {
        info!(
            principal_id = notification.principal_id,
            channel = ?notification.channel,
            template = %notification.template,
            "Notification dispatched"
        );
        debug!(vars = ?notification.vars, "Notification variables");
        Ok(true)
    }
}

/// POSTs the notification as JSON; any 2xx response counts as sent.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("gatekeeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<bool> {
        match self.client.post(&self.url).json(notification).send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                warn!(
                    status = %response.status(),
                    template = %notification.template,
                    "Notification webhook rejected delivery"
                );
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, template = %notification.template, "Notification webhook unreachable");
                Ok(false)
            }
        }
    }
}
