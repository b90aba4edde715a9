//! Award event publisher
//!
//! Emits `AwardCompleted` to the notification layer's webhook after a
//! successful award. Delivery is fire-and-forget: failures are logged and
//! never surfaced to the awarding caller.

use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// Emitted once per RFP, after the award commit is durable.
#[derive(Debug, Clone, Serialize)]
pub struct AwardCompleted {
    pub rfp_id: Uuid,
    pub project_id: Uuid,
    pub winning_bid_id: Uuid,
}

#[derive(Clone)]
pub struct EventPublisher {
    client: reqwest::Client,
    webhook_url: Option<Url>,
}

impl EventPublisher {
    pub fn new(client: reqwest::Client, webhook_url: Option<Url>) -> Self {
        Self {
            client,
            webhook_url,
        }
    }

    /// Spawns the delivery task and returns immediately.
    pub fn publish_award_completed(&self, event: AwardCompleted) {
        let Some(url) = self.webhook_url.clone() else {
            tracing::debug!(rfp_id = %event.rfp_id, "No award webhook configured, skipping event");
            return;
        };

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(url).json(&event).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(
                        rfp_id = %event.rfp_id,
                        project_id = %event.project_id,
                        "AwardCompleted event delivered"
                    );
                }
                Ok(resp) => {
                    tracing::warn!(
                        rfp_id = %event.rfp_id,
                        status = %resp.status(),
                        "AwardCompleted webhook rejected the event"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        rfp_id = %event.rfp_id,
                        error = %e,
                        "Failed to deliver AwardCompleted event"
                    );
                }
            }
        });
    }
}
