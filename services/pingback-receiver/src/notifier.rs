// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Announces accepted pingbacks to a webhook.

use anyhow::{anyhow, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::PingbackHistory;

/// Webhook client for accepted-pingback notifications
#[derive(Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    /// Deliveries that take longer than `timeout` are abandoned.
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    /// POST the record as JSON
    pub async fn notify(&self, record: &PingbackHistory) -> Result<()> {
        let response = self.client.post(&self.url).json(record).send().await?;

        if response.status().is_success() {
            debug!(id = %record.id, webhook = %self.url, "Pingback notification delivered");
            Ok(())
        } else {
            Err(anyhow!("Webhook error: {}", response.status()))
        }
    }

    /// Deliver in the background; failures are only logged.
    pub fn spawn_notify(&self, record: PingbackHistory) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&record).await {
                warn!(id = %record.id, error = %e, "Pingback notification failed");
            }
        });
    }
}
