//! Best-effort hire notifications.
//!
//! Delivery failures are logged and never surface to the caller: the referral
//! update has already committed by the time we get here.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HireEvent {
    pub event: &'static str,
    pub referral_id: Uuid,
    pub referrer_id: Uuid,
    pub job_id: Uuid,
    pub payout_created: bool,
}

impl HireEvent {
    pub fn new(referral_id: Uuid, referrer_id: Uuid, job_id: Uuid, payout_created: bool) -> Self {
        Self {
            event: "referral.hired",
            referral_id,
            referrer_id,
            job_id,
            payout_created,
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    http: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client for notifications: {e}");
                Client::new()
            });
        Self { http, webhook_url }
    }

    /// A notifier that drops every event.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Delivers the event on a background task so the caller's response is
    /// not held up by a slow endpoint.
    pub fn spawn_referral_hired(&self, event: HireEvent) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move { notifier.referral_hired(event).await })
    }

    pub async fn referral_hired(&self, event: HireEvent) {
        let Some(url) = self.webhook_url.as_deref() else {
            debug!("No webhook configured; skipping hire event for {}", event.referral_id);
            return;
        };

        match self.http.post(url).json(&event).send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!("Delivered hire event for referral {}", event.referral_id);
            }
            Ok(resp) => warn!(
                "Hire webhook for referral {} returned status {}",
                event.referral_id,
                resp.status()
            ),
            Err(e) => warn!(
                "Hire webhook for referral {} failed: {e}",
                event.referral_id
            ),
        }
    }
}
